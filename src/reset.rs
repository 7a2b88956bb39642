//! Board-level reset of a PSE chip.

use embedded_hal::{delay::DelayNs, digital::OutputPin};
use fugit::MillisDurationU32;
use log::{debug, error};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Reset line could not be driven")]
pub struct ResetFailed;

/// Something that can put the PSE chip through a hardware reset.
pub trait BoardReset {
    fn reset(&mut self) -> Result<(), ResetFailed>;
}

/// For boards without a reset line wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReset;

impl BoardReset for NoReset {
    fn reset(&mut self) -> Result<(), ResetFailed> {
        Ok(())
    }
}

/// When the reset pulse is issued relative to chip initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetOrder {
    #[default]
    BeforeChipInit,
    AfterChipInit,
}

/// Reset by pulsing a GPIO.
pub struct PinReset<P, D> {
    pin: P,
    delay: D,
    pulse: MillisDurationU32,
    active_low: bool,
}

impl<P: OutputPin, D: DelayNs> PinReset<P, D> {
    /// Active-low reset line held for `pulse`.
    pub fn new(pin: P, delay: D, pulse: MillisDurationU32) -> Self {
        Self {
            pin,
            delay,
            pulse,
            active_low: true,
        }
    }

    pub fn active_high(mut self) -> Self {
        self.active_low = false;
        self
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn drive(&mut self, asserted: bool) -> Result<(), ResetFailed> {
        let result = if asserted == self.active_low {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
        result.map_err(|e| {
            error!("Failed to drive reset line: {e:?}");
            ResetFailed
        })
    }
}

impl<P: OutputPin, D: DelayNs> BoardReset for PinReset<P, D> {
    /// Assert for the pulse width, release, then give the chip the same time to come up.
    fn reset(&mut self) -> Result<(), ResetFailed> {
        debug!("Pulsing PSE reset for {} ms", self.pulse.to_millis());
        self.drive(true)?;
        self.delay.delay_ms(self.pulse.to_millis());
        self.drive(false)?;
        self.delay.delay_ms(self.pulse.to_millis());
        Ok(())
    }
}
