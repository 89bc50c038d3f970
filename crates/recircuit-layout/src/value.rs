//! Dynamic record encoding against a compiled [`RecordLayout`].
//!
//! Statically generated records (see [`crate::packed_record!`]) cover the
//! schemas known at build time. This module handles any other schema, with
//! the same range checks and the same byte layout.

use crate::bits::{self, bytes_for_bits};
use crate::error::{LayoutError, Result};
use crate::layout::{FieldLayout, RecordLayout};
use crate::scalar::ScalarType;

/// A single field value supplied to, or read back from, a dynamic record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uint(u64),
    Float(f32),
    /// Raw little-endian bytes of a composite value, exactly its natural size.
    Bytes(Vec<u8>),
}

impl RecordLayout {
    /// Encode one value per field, in schema order.
    ///
    /// Packed values must be strictly less than `2^bit_width`; nothing is
    /// silently truncated.
    pub fn encode(&self, values: &[FieldValue]) -> Result<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(LayoutError::ArityMismatch {
                record: self.name.clone(),
                expected: self.fields.len(),
                found: values.len(),
            });
        }

        let mut buf = vec![0u8; self.size_bytes];
        for (field, value) in self.fields.iter().zip(values) {
            self.encode_field(&mut buf, field, value)?;
        }
        Ok(buf)
    }

    /// Decode a record's bytes into one value per field.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<FieldValue>> {
        if bytes.len() != self.size_bytes {
            return Err(LayoutError::ByteLength {
                record: self.name.clone(),
                expected: self.size_bytes,
                found: bytes.len(),
            });
        }

        Ok(self
            .fields
            .iter()
            .map(|field| match &field.scalar {
                ScalarType::U8 | ScalarType::U16 | ScalarType::U32 => {
                    FieldValue::Uint(bits::read_bits(bytes, field.bit_offset, field.bit_width))
                }
                ScalarType::F32 => FieldValue::Float(f32::from_bits(bits::read_bits(
                    bytes,
                    field.bit_offset,
                    32,
                ) as u32)),
                ScalarType::Composite { .. } => {
                    let mut out = vec![0u8; bytes_for_bits(field.bit_width)];
                    bits::copy_bits_out(bytes, field.bit_offset, field.bit_width, &mut out);
                    FieldValue::Bytes(out)
                }
            })
            .collect())
    }

    fn encode_field(&self, buf: &mut [u8], field: &FieldLayout, value: &FieldValue) -> Result<()> {
        match (&field.scalar, value) {
            (ScalarType::U8 | ScalarType::U16 | ScalarType::U32, FieldValue::Uint(v)) => {
                if !bits::fits(*v, field.bit_width) {
                    return Err(LayoutError::ValueOutOfRange {
                        record: self.name.clone(),
                        field: field.name.clone(),
                        value: *v,
                        bit_width: field.bit_width,
                    });
                }
                bits::write_bits(buf, field.bit_offset, field.bit_width, *v);
            }
            (ScalarType::F32, FieldValue::Float(v)) => {
                bits::write_bits(buf, field.bit_offset, 32, u64::from(v.to_bits()));
            }
            (ScalarType::Composite { .. }, FieldValue::Bytes(raw))
                if raw.len() == bytes_for_bits(field.bit_width) =>
            {
                bits::copy_bits_in(buf, field.bit_offset, raw, field.bit_width);
            }
            (scalar, _) => {
                return Err(LayoutError::ValueKind {
                    record: self.name.clone(),
                    field: field.name.clone(),
                    expected: scalar.to_string(),
                });
            }
        }
        Ok(())
    }
}
