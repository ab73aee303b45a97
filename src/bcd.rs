//! Packed decimal (BCD) codec for the SD3078 time registers.
//!
//! Every time-related register stores a two digit decimal value as two
//! nibbles: tens in the high nibble, units in the low nibble. The chip's
//! usable range is 0-98 (0x00-0x98); anything outside that is treated as
//! invalid.
//!
//! Two flavours are provided:
//!
//! - [`dec_to_bcd`] / [`bcd_to_dec`] are lenient and return `0` for invalid
//!   input. This can mask real faults (a corrupted register reads as zero)
//!   but is what the chip's history registers need before they are populated.
//! - [`try_dec_to_bcd`] / [`try_bcd_to_dec`] report [`CodecError`] instead.
//!
//! [`CodecPolicy`] selects between them at runtime.

/// Errors reported by the strict codec.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecError {
    /// The decimal value is outside 0-98
    OutOfRange,
    /// The packed byte is above 0x98 or has a units nibble above 9
    MalformedEncoding,
}

/// Largest decimal value (exclusive) the codec accepts.
const DECIMAL_LIMIT: u8 = 99;
/// Largest packed byte (exclusive) the codec accepts.
const PACKED_LIMIT: u8 = 0x99;

/// Encodes `value` as packed decimal, returning `0` when it is not in 0-98.
pub const fn dec_to_bcd(value: u8) -> u8 {
    if value >= DECIMAL_LIMIT {
        return 0;
    }
    ((value / 10) << 4) | (value % 10)
}

/// Decodes a packed decimal byte, returning `0` when it is not below 0x99.
///
/// Only the overall range is checked, a units nibble above 9 is decoded
/// arithmetically (`0x1A` reads as 20).
pub const fn bcd_to_dec(bcd: u8) -> u8 {
    if bcd >= PACKED_LIMIT {
        return 0;
    }
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Encodes `value` as packed decimal.
///
/// # Errors
/// [`CodecError::OutOfRange`] when `value` is not in 0-98.
pub fn try_dec_to_bcd(value: u8) -> Result<u8, CodecError> {
    if value >= DECIMAL_LIMIT {
        return Err(CodecError::OutOfRange);
    }
    Ok(dec_to_bcd(value))
}

/// Decodes a packed decimal byte.
///
/// # Errors
/// [`CodecError::MalformedEncoding`] when `bcd` is not below 0x99 or its
/// units nibble is not a decimal digit.
pub fn try_bcd_to_dec(bcd: u8) -> Result<u8, CodecError> {
    if bcd >= PACKED_LIMIT || bcd & 0x0F > 9 {
        return Err(CodecError::MalformedEncoding);
    }
    Ok(bcd_to_dec(bcd))
}

/// How the driver treats values the codec cannot represent.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecPolicy {
    /// Invalid values become zero and out-of-range requests are ignored
    #[default]
    Lenient,
    /// Invalid values and out-of-range requests are reported as errors
    Strict,
}

impl CodecPolicy {
    /// Encodes `value` according to the policy.
    pub fn encode(self, value: u8) -> Result<u8, CodecError> {
        match self {
            CodecPolicy::Lenient => Ok(dec_to_bcd(value)),
            CodecPolicy::Strict => try_dec_to_bcd(value),
        }
    }

    /// Decodes `bcd` according to the policy.
    pub fn decode(self, bcd: u8) -> Result<u8, CodecError> {
        match self {
            CodecPolicy::Lenient => Ok(bcd_to_dec(bcd)),
            CodecPolicy::Strict => try_bcd_to_dec(bcd),
        }
    }

    /// Whether the policy turns silent rejections into errors.
    pub fn is_strict(self) -> bool {
        self == CodecPolicy::Strict
    }
}
