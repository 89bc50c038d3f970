//! Flat-array storage for hierarchical recursive circuit graphs.
//!
//! A circuit is a forest of clusters. Each cluster owns a block of entry
//! nodes and a block of exit nodes, and nodes are joined by directed edges.
//! The whole graph is stored as seventeen homogeneous arrays of fixed-layout
//! records that reference each other by index and `(count, first)` ranges:
//!
//! - `clusters` point at contiguous node blocks,
//! - nodes point at contiguous slices of four edge tables, one per peer node
//!   kind and direction,
//! - optional annotation tables, parallel to their owners, carry the cluster
//!   hierarchy, animation keyframes and labels.
//!
//! [`assemble`] builds the arrays from a nested [`CircuitInput`] in four
//! passes (placement, edge ranges, edge records, annotations) and
//! [`validate`]s the result before handing back an [`AssembledCircuit`].
//! Record layouts come from [`recircuit_layout`].

pub mod assemble;
pub mod circuit;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod kind;
pub mod records;
pub mod store;
pub mod validate;

pub use assemble::assemble;
pub use circuit::AssembledCircuit;
pub use config::{AssemblyOptions, Emission};
pub use error::{AssemblyError, ConfigError, InvariantViolation, Owner, Result, StoreError};
pub use geometry::{Circle, Interpolate, Rectangle, Vector2};
pub use input::{
    CircleKeyframe, CircuitInput, ClusterInput, InputOwner, KeyframeInput, NodeInput, NodeRef,
    RectKeyframe,
};
pub use kind::{EdgeTable, NodeKind, RecordKind};
pub use records::NO_PARENT;
pub use store::{CircuitStore, FlatArray, Manifest, StoredRecord, TableDescriptor};
pub use validate::validate;
