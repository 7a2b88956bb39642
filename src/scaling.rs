//! Fixed-point conversions for PSE telemetry registers.
//!
//! Telemetry on the IP8008 is reported as a pair of byte registers holding an unsigned
//! fixed-point number. The split between integral and fractional bits differs per register,
//! e.g. voltages use 4 fraction bits, currents use 2.

use thiserror::Error;

/// Largest fraction width a 16 bit register pair can carry.
pub const MAX_FRACTION_BITS: u8 = 16;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedPointError {
    #[error("Register value {0:#x} does not fit in one byte")]
    ByteOutOfRange(u16),
    #[error("{0} fraction bits exceed the 16 bit register pair")]
    TooManyFractionBits(u8),
}

/// Decode a register pair into milli-units.
///
/// `msb` and `lsb` are concatenated into a 16 bit value. The lower `fraction_bits` are the
/// fractional part out of `2^fraction_bits`, which is truncated when scaled to thousandths.
///
/// Supply voltage `0x03 0x56` with 4 fraction bits:
/// * integral = `0x35` => 53 V
/// * fraction = `0x6` / 16 => 0.375 V
/// * result => `53375` mV
pub fn decode_milli(msb: u16, lsb: u16, fraction_bits: u8) -> Result<u32, FixedPointError> {
    if msb > 0xFF {
        return Err(FixedPointError::ByteOutOfRange(msb));
    }
    if lsb > 0xFF {
        return Err(FixedPointError::ByteOutOfRange(lsb));
    }
    if fraction_bits > MAX_FRACTION_BITS {
        return Err(FixedPointError::TooManyFractionBits(fraction_bits));
    }

    let full = (u32::from(msb) << 8) | u32::from(lsb);
    let integral = full >> fraction_bits;
    let fraction = full & ((1u32 << fraction_bits) - 1);

    // fraction < 2^16, so the product stays well inside u32.
    Ok(integral * 1000 + (fraction * 1000) / (1u32 << fraction_bits))
}

/// Decode a register pair read straight off the bus.
#[inline]
pub fn decode_bytes_milli(msb: u8, lsb: u8, fraction_bits: u8) -> Result<u32, FixedPointError> {
    decode_milli(msb.into(), lsb.into(), fraction_bits)
}

/// Convert whole watts as configured into milliwatts.
#[inline]
pub const fn watts_to_mw(watts: u16) -> u32 {
    watts as u32 * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supply_voltage_decode() {
        assert_eq!(decode_milli(0x03, 0x56, 4), Ok(53375));
    }

    #[test]
    fn test_zero_decodes_to_zero() {
        assert_eq!(decode_milli(0x00, 0x00, 4), Ok(0));
        assert_eq!(decode_milli(0x00, 0x00, 0), Ok(0));
    }

    #[test]
    fn test_fraction_truncates() {
        // 0b11 of 4 => 0.75, 0b1 of 16 => 0.0625 truncated to 62 thousandths.
        assert_eq!(decode_milli(0x00, 0x0b, 2), Ok(2750));
        assert_eq!(decode_milli(0x00, 0x01, 4), Ok(62));
    }

    #[test]
    fn test_no_fraction_bits() {
        assert_eq!(decode_milli(0x01, 0x00, 0), Ok(256_000));
    }

    #[test]
    fn test_all_fraction_bits() {
        // 0xffff / 65536 => 0.99998 => 999 thousandths.
        assert_eq!(decode_milli(0xff, 0xff, 16), Ok(999));
    }

    #[test]
    fn test_byte_out_of_range() {
        assert_eq!(
            decode_milli(0x100, 0x00, 4),
            Err(FixedPointError::ByteOutOfRange(0x100))
        );
        assert_eq!(
            decode_milli(0x00, 0x1ff, 4),
            Err(FixedPointError::ByteOutOfRange(0x1ff))
        );
    }

    #[test]
    fn test_too_many_fraction_bits() {
        assert_eq!(
            decode_milli(0x00, 0x00, 17),
            Err(FixedPointError::TooManyFractionBits(17))
        );
    }

    #[test]
    fn test_watts_to_mw() {
        assert_eq!(watts_to_mw(130), 130_000);
    }
}
