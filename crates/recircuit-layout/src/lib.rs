//! Record layout compiler.
//!
//! Turns a schema (an ordered list of named fields, each with a scalar type,
//! a bit width and a pack flag) into a fixed-layout record: fields placed
//! back to back at their declared widths, a constructor that rejects values
//! too wide for their field, and a size that always equals the bit sum
//! rounded up to whole bytes.
//!
//! Two front ends share one layout:
//!
//! - [`packed_record!`] generates a concrete type per schema at build time,
//!   with the size checked by a compile-time assertion.
//! - [`Schema::compile`] produces a [`RecordLayout`] at runtime for schemas
//!   that are only known as data; [`RecordLayout::encode`] and
//!   [`RecordLayout::decode`] read and write instances.
//!
//! ```text
//! Cluster (96 bits, 12 bytes)
//!    0..16   entry_node_count : u16
//!   16..48   first_entry_node_index : u32
//!   48..64   exit_node_count : u16
//!   64..96   first_exit_node_index : u32
//! ```
//!
//! The compiler knows nothing about what the records mean.

pub mod bits;
pub mod error;
pub mod layout;
mod macros;
pub mod record;
pub mod scalar;
pub mod schema;
pub mod value;

pub use bytemuck;

pub use error::{LayoutError, Result, SchemaError};
pub use layout::{FieldLayout, RecordLayout};
pub use record::{PackedRecord, PackedUint, PackedValue};
pub use scalar::ScalarType;
pub use schema::{FieldDef, Schema};
pub use value::FieldValue;
