//! Scalar type descriptors for schema fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The storage type of a single schema field.
///
/// Integer scalars can be packed into fewer bits than their natural width.
/// Floats and composites always occupy their natural width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    U8,
    U16,
    U32,
    F32,
    /// An opaque fixed-size value type (a geometry type or a nested record).
    Composite { type_name: String, bits: u32 },
}

impl ScalarType {
    /// Shorthand for a composite scalar.
    pub fn composite(type_name: impl Into<String>, bits: u32) -> Self {
        ScalarType::Composite {
            type_name: type_name.into(),
            bits,
        }
    }

    /// Width in bits of an unpacked value of this type.
    pub fn natural_bits(&self) -> u32 {
        match self {
            ScalarType::U8 => 8,
            ScalarType::U16 => 16,
            ScalarType::U32 | ScalarType::F32 => 32,
            ScalarType::Composite { bits, .. } => *bits,
        }
    }

    /// Whether values of this type may be bit-packed.
    pub fn is_integer(&self) -> bool {
        matches!(self, ScalarType::U8 | ScalarType::U16 | ScalarType::U32)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::U8 => write!(f, "u8"),
            ScalarType::U16 => write!(f, "u16"),
            ScalarType::U32 => write!(f, "u32"),
            ScalarType::F32 => write!(f, "f32"),
            ScalarType::Composite { type_name, bits } => write!(f, "{type_name}<{bits}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_widths() {
        assert_eq!(ScalarType::U8.natural_bits(), 8);
        assert_eq!(ScalarType::U16.natural_bits(), 16);
        assert_eq!(ScalarType::U32.natural_bits(), 32);
        assert_eq!(ScalarType::F32.natural_bits(), 32);
        assert_eq!(ScalarType::composite("Rectangle", 128).natural_bits(), 128);
    }

    #[test]
    fn only_unsigned_integers_pack() {
        assert!(ScalarType::U16.is_integer());
        assert!(!ScalarType::F32.is_integer());
        assert!(!ScalarType::composite("Vector2", 64).is_integer());
    }

    #[test]
    fn display() {
        assert_eq!(ScalarType::U32.to_string(), "u32");
        assert_eq!(
            ScalarType::composite("Vector2", 64).to_string(),
            "Vector2<64>"
        );
    }
}
