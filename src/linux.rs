//! `embedded-hal` I2C bus on top of a Linux `/dev/i2c-N` character device.
//!
//! Transactions are issued through `linux-embedded-hal`, so all operations of one transaction are
//! joined by repeated starts.

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use linux_embedded_hal::{I2CError, I2cdev, i2cdev::linux::LinuxI2CError};
use log::debug;

pub struct LinuxI2c {
    dev: I2cdev,
    bus: u8,
}

impl LinuxI2c {
    /// Open `/dev/i2c-<bus>`.
    pub fn open(bus: u8) -> Result<Self, LinuxI2CError> {
        let path = format!("/dev/i2c-{bus}");
        let dev = I2cdev::new(&path)?;
        debug!("Opened {path}");
        Ok(Self { dev, bus })
    }

    pub fn bus(&self) -> u8 {
        self.bus
    }
}

impl ErrorType for LinuxI2c {
    type Error = I2CError;
}

impl I2c for LinuxI2c {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return Ok(());
        }
        self.dev.transaction(address, operations)
    }
}
