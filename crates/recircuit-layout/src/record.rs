//! Traits shared by statically generated records and the values they hold.

use std::fmt;

use crate::bits;
use crate::error::{LayoutError, Result, SchemaError};
use crate::layout::RecordLayout;
use crate::scalar::ScalarType;
use crate::schema::Schema;

/// A fixed-size value that can be stored at a bit offset inside a record.
pub trait PackedValue: Copy {
    /// Natural width in bits.
    const BITS: u32;

    /// Descriptor used when this type appears in a schema.
    fn scalar_type() -> ScalarType;

    /// Write all [`Self::BITS`] bits at `bit_offset`.
    fn pack_into(&self, buf: &mut [u8], bit_offset: u32);

    /// Read a value previously written by [`PackedValue::pack_into`].
    fn unpack_from(buf: &[u8], bit_offset: u32) -> Self;
}

/// An unsigned integer that can be stored in fewer bits than its natural width.
pub trait PackedUint: PackedValue {
    fn to_u64(self) -> u64;

    /// Convert back from a field read; the caller guarantees the value fits.
    fn from_u64_truncating(value: u64) -> Self;
}

macro_rules! impl_packed_uint {
    ($($ty:ty => $scalar:ident),+ $(,)?) => {$(
        impl PackedValue for $ty {
            const BITS: u32 = <$ty>::BITS;

            fn scalar_type() -> ScalarType {
                ScalarType::$scalar
            }

            fn pack_into(&self, buf: &mut [u8], bit_offset: u32) {
                bits::write_bits(buf, bit_offset, Self::BITS, u64::from(*self));
            }

            fn unpack_from(buf: &[u8], bit_offset: u32) -> Self {
                bits::read_bits(buf, bit_offset, Self::BITS) as $ty
            }
        }

        impl PackedUint for $ty {
            fn to_u64(self) -> u64 {
                u64::from(self)
            }

            fn from_u64_truncating(value: u64) -> Self {
                value as $ty
            }
        }
    )+};
}

impl_packed_uint!(u8 => U8, u16 => U16, u32 => U32);

impl PackedValue for f32 {
    const BITS: u32 = 32;

    fn scalar_type() -> ScalarType {
        ScalarType::F32
    }

    fn pack_into(&self, buf: &mut [u8], bit_offset: u32) {
        bits::write_bits(buf, bit_offset, 32, u64::from(self.to_bits()));
    }

    fn unpack_from(buf: &[u8], bit_offset: u32) -> Self {
        f32::from_bits(bits::read_bits(buf, bit_offset, 32) as u32)
    }
}

/// A record type generated by [`crate::packed_record!`].
///
/// Records are plain bytes with alignment 1, so a slice of records can be
/// viewed as one contiguous byte buffer with no padding between elements.
pub trait PackedRecord: PackedValue + bytemuck::Pod + fmt::Debug {
    const NAME: &'static str;
    const TOTAL_BITS: u32;
    const SIZE_BYTES: usize;

    /// The schema this record was generated from.
    fn schema() -> Schema;

    /// The compiled type descriptor for this record.
    fn layout() -> std::result::Result<RecordLayout, SchemaError> {
        Self::schema().compile()
    }

    fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Reinterpret exactly [`Self::SIZE_BYTES`] bytes as a record.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE_BYTES {
            return Err(LayoutError::ByteLength {
                record: Self::NAME.to_string(),
                expected: Self::SIZE_BYTES,
                found: bytes.len(),
            });
        }
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}
