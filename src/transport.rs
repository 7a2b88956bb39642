//! Byte-wide register access to a PSE chip over I2C.
//!
//! Chips differ in how they want their registers accessed. See [`WireFlavor`].

use embedded_hal::i2c::{I2c, SevenBitAddress};
use log::trace;

/// Byte-wide register access at a fixed chip address.
///
/// Chip drivers are written against this trait, so they can run against any bus the
/// [`I2cTransport`] can wrap, or against a test double.
pub trait RegisterBus {
    type Error: core::fmt::Debug;

    /// Write `value` to `register`.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Read `buf.len()` consecutive registers starting at `register`.
    ///
    /// On error, `buf` is left zeroed.
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Read a single register.
    fn read_register(&mut self, register: u8) -> Result<u8, Self::Error> {
        let mut value = [0u8; 1];
        self.read_registers(register, &mut value)?;
        Ok(value[0])
    }
}

/// How register accesses are framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFlavor {
    /// Writes are a single `[register, value]` message. Reads select the register in one
    /// message and read in a second, with a STOP condition in between.
    Transaction,
    /// Every access is an SMBus style block command of one command byte plus one data byte.
    /// Multi-byte reads are issued one register at a time.
    BlockCommand,
}

/// Direction of a block command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Where a chip sits and how to talk to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipLocation {
    /// Bus index.
    pub bus: u8,
    pub address: SevenBitAddress,
    pub flavor: WireFlavor,
}

/// [`RegisterBus`] over an `embedded-hal` I2C bus.
pub struct I2cTransport<I> {
    bus: I,
    address: SevenBitAddress,
    flavor: WireFlavor,
}

impl<I: I2c> I2cTransport<I> {
    pub fn new(bus: I, address: SevenBitAddress, flavor: WireFlavor) -> Self {
        Self {
            bus,
            address,
            flavor,
        }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    pub fn flavor(&self) -> WireFlavor {
        self.flavor
    }

    pub fn inner(&self) -> &I {
        &self.bus
    }

    pub fn inner_mut(&mut self) -> &mut I {
        &mut self.bus
    }

    /// Give back the wrapped bus.
    pub fn release(self) -> I {
        self.bus
    }

    /// Issue a single block command.
    ///
    /// For [`Direction::Write`], `data` is sent. For [`Direction::Read`], `data` receives the
    /// byte read back.
    pub fn block_access(
        &mut self,
        direction: Direction,
        command: u8,
        data: &mut u8,
    ) -> Result<(), I::Error> {
        trace!(
            "block {direction:?} addr={:#04x} cmd={command:#04x}",
            self.address
        );
        match direction {
            Direction::Write => self.bus.write(self.address, &[command, *data]),
            Direction::Read => {
                let mut value = [0u8; 1];
                self.bus.write_read(self.address, &[command], &mut value)?;
                *data = value[0];
                Ok(())
            }
        }
    }
}

impl<I: I2c> RegisterBus for I2cTransport<I> {
    type Error = I::Error;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        trace!(
            "write addr={:#04x} reg={register:#04x} value={value:#04x}",
            self.address
        );
        match self.flavor {
            WireFlavor::Transaction => self.bus.write(self.address, &[register, value]),
            WireFlavor::BlockCommand => {
                let mut data = value;
                self.block_access(Direction::Write, register, &mut data)
            }
        }
    }

    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        buf.fill(0);
        let result = match self.flavor {
            // Two separate transactions, so the bus sees a STOP after the register select.
            WireFlavor::Transaction => self
                .bus
                .write(self.address, &[register])
                .and_then(|()| self.bus.read(self.address, buf)),
            WireFlavor::BlockCommand => {
                let mut result = Ok(());
                for (offset, slot) in buf.iter_mut().enumerate() {
                    let mut data = 0;
                    let command = register.wrapping_add(offset as u8);
                    result = self.block_access(Direction::Read, command, &mut data);
                    if result.is_err() {
                        break;
                    }
                    *slot = data;
                }
                result
            }
        };
        if result.is_err() {
            buf.fill(0);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_bus::{MockI2c, MockOp, RegisterLayout};

    const ADDRESS: u8 = 0x20;

    fn transport(flavor: WireFlavor) -> I2cTransport<MockI2c> {
        let mock = MockI2c::new(ADDRESS, RegisterLayout::Flat);
        I2cTransport::new(mock, ADDRESS, flavor)
    }

    #[test]
    fn transaction_write_is_one_message() {
        let mut bus = transport(WireFlavor::Transaction);
        bus.write_register(0x12, 0xAB).unwrap();
        assert_eq!(bus.inner().transactions(), &[vec![MockOp::Write(2)]]);
        assert_eq!(bus.inner().register(0, 0x12), 0xAB);
    }

    #[test]
    fn transaction_read_stops_after_register_select() {
        let mut bus = transport(WireFlavor::Transaction);
        bus.inner_mut().set_register(0, 0x41, 0x11);
        bus.inner_mut().set_register(0, 0x42, 0x22);

        let mut buf = [0u8; 2];
        bus.read_registers(0x41, &mut buf).unwrap();
        assert_eq!(buf, [0x11, 0x22]);
        assert_eq!(
            bus.inner().transactions(),
            &[vec![MockOp::Write(1)], vec![MockOp::Read(2)]]
        );
    }

    #[test]
    fn block_command_reads_one_register_at_a_time() {
        let mut bus = transport(WireFlavor::BlockCommand);
        bus.inner_mut().set_register(0, 0x0C, 0x01);
        bus.inner_mut().set_register(0, 0x0D, 0x02);
        bus.inner_mut().set_register(0, 0x0E, 0x03);

        let mut buf = [0u8; 3];
        bus.read_registers(0x0C, &mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03]);
        let read = vec![MockOp::Write(1), MockOp::Read(1)];
        assert_eq!(
            bus.inner().transactions(),
            &[read.clone(), read.clone(), read]
        );
    }

    #[test]
    fn block_command_write() {
        let mut bus = transport(WireFlavor::BlockCommand);
        bus.write_register(0x89, 20).unwrap();
        assert_eq!(bus.inner().transactions(), &[vec![MockOp::Write(2)]]);
        assert_eq!(bus.inner().register(0, 0x89), 20);
    }

    #[test]
    fn failed_read_leaves_buffer_zeroed() {
        for flavor in [WireFlavor::Transaction, WireFlavor::BlockCommand] {
            let mut bus = transport(flavor);
            bus.inner_mut().set_register(0, 0x10, 0xFF);
            bus.inner_mut().set_read_error(true);

            let mut buf = [0xEEu8; 2];
            assert!(bus.read_registers(0x10, &mut buf).is_err());
            assert_eq!(buf, [0, 0]);
        }
    }

    #[test]
    fn wrong_address_is_not_acknowledged() {
        let mut bus = I2cTransport::new(
            MockI2c::new(ADDRESS, RegisterLayout::Flat),
            0x21,
            WireFlavor::Transaction,
        );
        assert!(bus.read_register(0x00).is_err());
        assert!(bus.write_register(0x00, 1).is_err());
    }
}
