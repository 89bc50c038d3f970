//! Compiled record layouts: field order, bit offsets, total size.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bits::bytes_for_bits;
use crate::error::SchemaError;
use crate::scalar::ScalarType;
use crate::schema::Schema;

/// Placement of one field inside a compiled record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    pub scalar: ScalarType,
    /// Offset of the field's first bit from the start of the record.
    pub bit_offset: u32,
    /// Bits the field occupies.
    pub bit_width: u32,
    pub packed: bool,
}

impl FieldLayout {
    /// One past the field's last bit.
    pub fn bit_end(&self) -> u32 {
        self.bit_offset + self.bit_width
    }

    /// Exclusive upper bound on values this field can store, if it is a
    /// packed integer narrower than 64 bits.
    pub fn value_limit(&self) -> Option<u64> {
        (self.packed && self.bit_width < 64).then(|| 1u64 << self.bit_width)
    }
}

/// The type descriptor produced for a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
    pub total_bits: u32,
    pub size_bytes: usize,
}

impl RecordLayout {
    /// Compile a schema: validate it, then place fields contiguously in
    /// declaration order.
    pub fn compile(schema: &Schema) -> Result<Self, SchemaError> {
        if let Err(mut errors) = schema.validate() {
            return Err(errors.remove(0));
        }

        let mut fields = Vec::with_capacity(schema.fields.len());
        let mut offset: u32 = 0;
        for field in &schema.fields {
            let bit_width = if field.packed {
                field.bit_width
            } else {
                field.scalar.natural_bits()
            };
            fields.push(FieldLayout {
                name: field.name.clone(),
                scalar: field.scalar.clone(),
                bit_offset: offset,
                bit_width,
                packed: field.packed,
            });
            offset = offset
                .checked_add(bit_width)
                .ok_or_else(|| SchemaError::RecordTooLarge {
                    schema: schema.name.clone(),
                    bits: schema.declared_bits(),
                })?;
        }

        let layout = Self {
            name: schema.name.clone(),
            fields,
            total_bits: offset,
            size_bytes: bytes_for_bits(offset),
        };
        debug_assert_eq!(u64::from(layout.total_bits), schema.declared_bits());
        Ok(layout)
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Byte offset of a field, if it starts on a byte boundary.
    pub fn byte_offset(&self, name: &str) -> Option<usize> {
        self.field(name)
            .filter(|f| f.bit_offset % 8 == 0)
            .map(|f| (f.bit_offset / 8) as usize)
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({} bits, {} bytes)",
            self.name, self.total_bits, self.size_bytes
        )?;
        for field in &self.fields {
            writeln!(
                f,
                "  {:>4}..{:<4} {} : {}{}",
                field.bit_offset,
                field.bit_end(),
                field.name,
                field.scalar,
                if field.packed { "" } else { " (natural)" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn node_info() -> Schema {
        let mut schema = Schema::builder("NodeInfo");
        for prefix in ["entry_edge_front", "entry_edge_reverse", "exit_edge_front", "exit_edge_reverse"] {
            schema = schema
                .field(FieldDef::packed(format!("{prefix}_count"), ScalarType::U16, 16))
                .field(FieldDef::packed(format!("first_{prefix}_index"), ScalarType::U32, 32));
        }
        schema.field(FieldDef::packed("cluster_index", ScalarType::U32, 32))
    }

    #[test]
    fn offsets_follow_declaration_order() {
        let layout = node_info().compile().unwrap();
        assert_eq!(layout.total_bits, 224);
        assert_eq!(layout.size_bytes, 28);
        assert_eq!(layout.field("entry_edge_front_count").unwrap().bit_offset, 0);
        assert_eq!(layout.field("first_entry_edge_front_index").unwrap().bit_offset, 16);
        assert_eq!(layout.field("entry_edge_reverse_count").unwrap().bit_offset, 48);
        assert_eq!(layout.byte_offset("cluster_index"), Some(24));
    }

    #[test]
    fn size_rounds_up_to_whole_bytes() {
        let layout = Schema::builder("Flags")
            .field(FieldDef::packed("a", ScalarType::U8, 3))
            .field(FieldDef::packed("b", ScalarType::U16, 10))
            .compile()
            .unwrap();
        assert_eq!(layout.total_bits, 13);
        assert_eq!(layout.size_bytes, 2);
        assert_eq!(layout.byte_offset("b"), None);
        assert_eq!(layout.field("b").unwrap().value_limit(), Some(1024));
    }

    #[test]
    fn natural_fields_take_full_width() {
        let layout = Schema::builder("Keyframe")
            .field(FieldDef::natural("start", ScalarType::composite("Rectangle", 128)))
            .field(FieldDef::natural("time", ScalarType::F32))
            .compile()
            .unwrap();
        assert_eq!(layout.size_bytes, 20);
        assert_eq!(layout.field("time").unwrap().bit_offset, 128);
        assert_eq!(layout.field("time").unwrap().value_limit(), None);
    }

    #[test]
    fn invalid_schema_does_not_compile() {
        let schema = Schema::builder("Bad").field(FieldDef::packed("x", ScalarType::U8, 12));
        assert!(matches!(
            schema.compile(),
            Err(SchemaError::WidthExceedsScalar { .. })
        ));
    }

    #[test]
    fn oversized_schema_is_an_error() {
        let blob = ScalarType::composite("Blob", 3_000_000_000);
        let schema = Schema::builder("Huge")
            .field(FieldDef::natural("a", blob.clone()))
            .field(FieldDef::natural("b", blob));
        assert_eq!(
            schema.compile(),
            Err(SchemaError::RecordTooLarge {
                schema: "Huge".into(),
                bits: 6_000_000_000,
            })
        );
    }

    #[test]
    fn display_lists_fields() {
        let text = node_info().compile().unwrap().to_string();
        assert!(text.starts_with("NodeInfo (224 bits, 28 bytes)"));
        assert!(text.contains("cluster_index : u32"));
    }

    #[test]
    fn layout_serializes_as_descriptor() {
        let layout = node_info().compile().unwrap();
        let json = serde_json::to_string(&layout).unwrap();
        let back: RecordLayout = serde_json::from_str(&json).unwrap();
        assert_eq!(back, layout);
    }
}
