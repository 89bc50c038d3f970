//! Schema definitions: the ordered field lists records are compiled from.
//!
//! A schema can be built in code or loaded from a TOML document:
//!
//! ```toml
//! name = "Cluster"
//!
//! [[fields]]
//! name = "entry_node_count"
//! scalar = "u16"
//! bit_width = 16
//!
//! [[fields]]
//! name = "start_territory"
//! scalar = { composite = { type_name = "Rectangle", bits = 128 } }
//! bit_width = 128
//! packed = false
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::layout::RecordLayout;
use crate::scalar::ScalarType;

/// One field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub scalar: ScalarType,
    pub bit_width: u32,
    /// Packed fields occupy exactly `bit_width` bits; unpacked fields occupy
    /// their scalar's natural width.
    #[serde(default = "default_packed")]
    pub packed: bool,
}

fn default_packed() -> bool {
    true
}

impl FieldDef {
    /// A bit-packed integer field.
    ///
    /// Only packed fields choose their width. An unpacked field must declare
    /// exactly its scalar's natural width (see [`FieldDef::natural`]); any
    /// other width is rejected as [`SchemaError::NaturalWidthMismatch`], so a
    /// record's byte size always equals its declared bit sum rounded up.
    pub fn packed(name: impl Into<String>, scalar: ScalarType, bit_width: u32) -> Self {
        Self {
            name: name.into(),
            scalar,
            bit_width,
            packed: true,
        }
    }

    /// A field stored at its scalar's natural width.
    pub fn natural(name: impl Into<String>, scalar: ScalarType) -> Self {
        let bit_width = scalar.natural_bits();
        Self {
            name: name.into(),
            scalar,
            bit_width,
            packed: false,
        }
    }
}

/// An ordered list of named fields. Declaration order is layout order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Start an empty schema to be filled with [`Schema::field`].
    pub fn builder(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Parse a schema from a TOML document.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, SchemaError> {
        toml::from_str(toml_str).map_err(|e| SchemaError::Parse {
            detail: e.to_string(),
        })
    }

    /// Sum of the declared bit widths.
    pub fn declared_bits(&self) -> u64 {
        self.fields.iter().map(|f| u64::from(f.bit_width)).sum()
    }

    /// Check every field definition.
    ///
    /// Returns all problems found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<SchemaError>> {
        let mut errors = Vec::new();
        if self.fields.is_empty() {
            errors.push(SchemaError::EmptySchema {
                schema: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for (position, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                errors.push(SchemaError::EmptyFieldName {
                    schema: self.name.clone(),
                    position,
                });
            } else if !seen.insert(field.name.as_str()) {
                errors.push(SchemaError::DuplicateField {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
            }

            if field.bit_width == 0 {
                errors.push(SchemaError::ZeroWidth {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                });
                continue;
            }

            let natural = field.scalar.natural_bits();
            if field.packed {
                if !field.scalar.is_integer() {
                    errors.push(SchemaError::PackedNonInteger {
                        schema: self.name.clone(),
                        field: field.name.clone(),
                        scalar: field.scalar.to_string(),
                    });
                } else if field.bit_width > natural {
                    errors.push(SchemaError::WidthExceedsScalar {
                        schema: self.name.clone(),
                        field: field.name.clone(),
                        bit_width: field.bit_width,
                        capacity: natural,
                    });
                }
            } else if field.bit_width != natural {
                errors.push(SchemaError::NaturalWidthMismatch {
                    schema: self.name.clone(),
                    field: field.name.clone(),
                    declared: field.bit_width,
                    natural,
                });
            }
        }

        let bits = self.declared_bits();
        if bits > u64::from(u32::MAX) {
            errors.push(SchemaError::RecordTooLarge {
                schema: self.name.clone(),
                bits,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and compile into a fixed layout.
    ///
    /// Reports the first schema error; use [`Schema::validate`] for all of them.
    pub fn compile(&self) -> Result<RecordLayout, SchemaError> {
        RecordLayout::compile(self)
    }
}
