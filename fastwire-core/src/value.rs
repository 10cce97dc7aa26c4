//! Runtime field values.
//!
//! A [`FieldValue`] is the decoded form of one FAST field: an integer, a
//! decimal (mantissa/exponent pair), an ASCII string, or a byte vector.
//! Values of this type flow out of the decoder, into the encoder, and
//! through the per-field previous-value cache.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded FAST field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Unsigned integer value (uInt32/uInt64 on the wire).
    UInt(u64),
    /// Signed integer value (int32/int64 on the wire).
    Int(i64),
    /// Decimal value as mantissa and base-10 exponent.
    Decimal {
        /// Mantissa.
        mantissa: i64,
        /// Base-10 exponent.
        exponent: i32,
    },
    /// ASCII string value.
    Ascii(String),
    /// Raw byte vector value.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Returns the value as a u64, if it is an unsigned integer.
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an i64, if it is a signed integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a string slice, if it is an ASCII string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a byte slice, if it is a byte vector.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a (mantissa, exponent) pair, if it is a decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Option<(i64, i32)> {
        match self {
            Self::Decimal { mantissa, exponent } => Some((*mantissa, *exponent)),
            _ => None,
        }
    }

    /// Returns a short name for the value's type, used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::UInt(_) => "uint",
            Self::Int(_) => "int",
            Self::Decimal { .. } => "decimal",
            Self::Ascii(_) => "ascii",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Decimal { mantissa, exponent } => write!(f, "{mantissa}e{exponent}"),
            Self::Ascii(s) => write!(f, "{s}"),
            Self::Bytes(b) => {
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Ascii(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Ascii(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}
