//! Layout compiler errors.

use thiserror::Error;

/// A malformed schema, reported before any record type built from it is usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Schema with an empty field list.
    #[error("schema `{schema}` declares no fields")]
    EmptySchema { schema: String },

    /// Field with an empty name.
    #[error("schema `{schema}` has an unnamed field at position {position}")]
    EmptyFieldName { schema: String, position: usize },

    /// Two fields share a name.
    #[error("schema `{schema}` declares field `{field}` more than once")]
    DuplicateField { schema: String, field: String },

    /// Field declared zero bits wide.
    #[error("field `{schema}.{field}` has a bit width of zero")]
    ZeroWidth { schema: String, field: String },

    /// Packed field wider than its scalar type.
    #[error("field `{schema}.{field}` is {bit_width} bits wide but its scalar type holds {capacity}")]
    WidthExceedsScalar {
        schema: String,
        field: String,
        bit_width: u32,
        capacity: u32,
    },

    /// Packed field whose scalar is not an unsigned integer.
    #[error("field `{schema}.{field}` is packed but its scalar type {scalar} is not an integer")]
    PackedNonInteger {
        schema: String,
        field: String,
        scalar: String,
    },

    /// Unpacked field whose declared width is not its natural width.
    #[error("field `{schema}.{field}` declares {declared} bits but its natural width is {natural}")]
    NaturalWidthMismatch {
        schema: String,
        field: String,
        declared: u32,
        natural: u32,
    },

    /// Field widths sum past what a bit offset can address.
    #[error("schema `{schema}` totals {bits} bits, more than a record can hold")]
    RecordTooLarge { schema: String, bits: u64 },

    /// Schema document that could not be parsed.
    #[error("invalid schema document: {detail}")]
    Parse { detail: String },
}

/// Errors raised while building or decoding a record instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Packed value not strictly below `2^bit_width`.
    #[error("value {value} does not fit the {bit_width}-bit field `{record}.{field}`")]
    ValueOutOfRange {
        record: String,
        field: String,
        value: u64,
        bit_width: u32,
    },

    /// Wrong number of values for a dynamic record.
    #[error("record `{record}` takes {expected} field values, got {found}")]
    ArityMismatch {
        record: String,
        expected: usize,
        found: usize,
    },

    /// Value of the wrong kind for its field.
    #[error("field `{record}.{field}` expects a {expected} value")]
    ValueKind {
        record: String,
        field: String,
        expected: String,
    },

    /// Byte buffer of the wrong length for the record.
    #[error("record `{record}` occupies {expected} bytes, got {found}")]
    ByteLength {
        record: String,
        expected: usize,
        found: usize,
    },

    /// The record's schema failed to compile.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
