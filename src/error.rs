//! Our error types for the PSE drivers and board profiles.

use thiserror::Error;

use crate::scaling::FixedPointError;

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Error type for PSE chip and profile operations.
///
/// `E` is the error type of the underlying bus transport.
#[derive(Error, Debug)]
pub enum Error<E: core::fmt::Debug> {
    #[error("I2C bus error: {0:?}")]
    Bus(E),
    #[error("PSE device is not ready")]
    NotReady,
    #[error("Value {value} does not fit a {bits}-bit field")]
    OutOfRange { value: u32, bits: u8 },
    #[error("Port {0} is outside the chip's port range")]
    InvalidPort(usize),
    #[error("Fixed-point decode failed: {0}")]
    FixedPoint(#[from] FixedPointError),
    #[error("Board reset failed")]
    Reset,
}

/// Errors raised while loading settings. These are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required setting `{0}` is missing")]
    MissingSetting(&'static str),
    #[error("Setting `{0}` has an invalid value")]
    InvalidValue(&'static str),
    #[error("Unknown profile")]
    UnknownProfile,
}
