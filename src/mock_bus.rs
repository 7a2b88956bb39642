//! We use this mocking module in unit tests to emulate PSE chips sitting on an I2C bus.

use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

/// How the emulated chip lays out its registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterLayout {
    /// One bank of 256 registers.
    Flat,
    /// Four pages of 256 registers. Register 0x00 is shared and selects the page in bits 7:6.
    Paged,
}

/// Shape of one message within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Write(usize),
    Read(usize),
}

/// A register store performed by the bus master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Page selected when the write happened.
    pub page: u8,
    pub register: u8,
    pub value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockI2cError {
    NoAcknowledge,
    SimulatedError,
}

impl i2c::Error for MockI2cError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAcknowledge => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Self::SimulatedError => ErrorKind::Bus,
        }
    }
}

pub struct MockI2c {
    address: u8,
    layout: RegisterLayout,
    pages: [[u8; 256]; 4],
    page_select: u8,
    pointer: u8,
    transactions: Vec<Vec<MockOp>>,
    writes: Vec<RegisterWrite>,
    read_error: bool,
    write_error: bool,
    fail_writes_to: Option<u8>,
}

impl MockI2c {
    pub fn new(address: u8, layout: RegisterLayout) -> Self {
        Self {
            address,
            layout,
            pages: [[0; 256]; 4],
            page_select: 0,
            pointer: 0,
            transactions: Vec::new(),
            writes: Vec::new(),
            read_error: false,
            write_error: false,
            fail_writes_to: None,
        }
    }

    pub fn paged(address: u8) -> Self {
        Self::new(address, RegisterLayout::Paged)
    }

    pub fn flat(address: u8) -> Self {
        Self::new(address, RegisterLayout::Flat)
    }

    /// Page currently selected on the emulated chip.
    pub fn current_page(&self) -> u8 {
        match self.layout {
            RegisterLayout::Flat => 0,
            RegisterLayout::Paged => (self.page_select >> 6) & 0b11,
        }
    }

    /// Raw value of the page select register.
    pub fn page_select(&self) -> u8 {
        self.page_select
    }

    pub fn set_register(&mut self, page: u8, register: u8, value: u8) {
        match (self.layout, register) {
            (RegisterLayout::Paged, 0) => self.page_select = value,
            _ => self.pages[usize::from(page & 0b11)][usize::from(register)] = value,
        }
    }

    pub fn register(&self, page: u8, register: u8) -> u8 {
        match (self.layout, register) {
            (RegisterLayout::Paged, 0) => self.page_select,
            _ => self.pages[usize::from(page & 0b11)][usize::from(register)],
        }
    }

    pub fn transactions(&self) -> &[Vec<MockOp>] {
        &self.transactions
    }

    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Writes to anything but the page select register.
    pub fn data_writes(&self) -> Vec<RegisterWrite> {
        self.writes
            .iter()
            .filter(|w| !(self.layout == RegisterLayout::Paged && w.register == 0))
            .copied()
            .collect()
    }

    /// Last value written to `register` on `page`, if any.
    pub fn last_write(&self, page: u8, register: u8) -> Option<u8> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.page == page && w.register == register)
            .map(|w| w.value)
    }

    pub fn clear_log(&mut self) {
        self.transactions.clear();
        self.writes.clear();
    }

    pub fn set_read_error(&mut self, enabled: bool) {
        self.read_error = enabled;
    }

    pub fn set_write_error(&mut self, enabled: bool) {
        self.write_error = enabled;
    }

    /// Fail any data write landing on `register`.
    pub fn fail_writes_to(&mut self, register: Option<u8>) {
        self.fail_writes_to = register;
    }

    fn load(&self, register: u8) -> u8 {
        self.register(self.current_page(), register)
    }

    fn store(&mut self, register: u8, value: u8) {
        self.writes.push(RegisterWrite {
            page: self.current_page(),
            register,
            value,
        });
        self.set_register(self.current_page(), register, value);
    }
}

impl ErrorType for MockI2c {
    type Error = MockI2cError;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != self.address {
            return Err(MockI2cError::NoAcknowledge);
        }

        self.transactions.push(
            operations
                .iter()
                .map(|op| match op {
                    Operation::Write(bytes) => MockOp::Write(bytes.len()),
                    Operation::Read(buf) => MockOp::Read(buf.len()),
                })
                .collect(),
        );

        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&register, data)) = bytes.split_first() else {
                        continue;
                    };
                    if self.write_error && !data.is_empty() {
                        return Err(MockI2cError::SimulatedError);
                    }
                    self.pointer = register;
                    for &value in data {
                        if self.fail_writes_to == Some(self.pointer) {
                            return Err(MockI2cError::SimulatedError);
                        }
                        self.store(self.pointer, value);
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
                Operation::Read(buf) => {
                    if self.read_error {
                        return Err(MockI2cError::SimulatedError);
                    }
                    for slot in buf.iter_mut() {
                        *slot = self.load(self.pointer);
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}
