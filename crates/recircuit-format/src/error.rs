//! Circuit format error types.

use std::fmt;
use std::path::PathBuf;

use recircuit_layout::LayoutError;

use crate::input::InputOwner;
use crate::kind::{EdgeTable, NodeKind, RecordKind};

/// Errors raised by the flat array store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// More records than a u32 index can address.
    #[error("cannot allocate {requested} `{kind}` records, the limit is {max}")]
    CapacityExceeded {
        kind: RecordKind,
        requested: usize,
        max: usize,
    },

    /// The allocator refused the block.
    #[error("failed to allocate {count} `{kind}` records")]
    AllocationFailed { kind: RecordKind, count: usize },

    /// Index past the end of the table.
    #[error("index {index} is outside `{kind}` (length {len})")]
    IndexOutOfBounds {
        kind: RecordKind,
        index: usize,
        len: usize,
    },

    /// A read of a slot that was allocated but never written.
    #[error("slot {index} of `{kind}` has not been populated")]
    SlotUnset { kind: RecordKind, index: usize },

    /// Table handed on before every slot was written.
    #[error("`{kind}` has {populated} of {len} slots populated")]
    NotFullyPopulated {
        kind: RecordKind,
        populated: usize,
        len: usize,
    },
}

/// A graph node or cluster, by its index in the stored arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// A cluster, by stored cluster index.
    Cluster(usize),
    /// An entry or exit node, by index in its node table.
    Node { kind: NodeKind, index: usize },
}

impl Owner {
    pub fn node(kind: NodeKind, index: usize) -> Self {
        Owner::Node { kind, index }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Cluster(index) => write!(f, "cluster {index}"),
            Owner::Node { kind, index } => write!(f, "{kind} node {index}"),
        }
    }
}

/// A broken invariant found in an assembled store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    /// Table with slots never written.
    #[error("`{kind}` has {populated} of {len} slots populated")]
    Unpopulated {
        kind: RecordKind,
        populated: usize,
        len: usize,
    },

    /// An annotation table that is neither empty nor one slot per owner.
    #[error("`{kind}` has {len} slots but its owner table has {expected}")]
    AnnotationLength {
        kind: RecordKind,
        len: usize,
        expected: usize,
    },

    /// A `(count, first)` range running past the end of its table.
    #[error("{owner} claims `{table}`[{start}..{end}] but the table has {len} records")]
    RangeOutOfBounds {
        owner: Owner,
        table: RecordKind,
        start: usize,
        end: usize,
        len: usize,
    },

    /// A slot claimed by no range, or by more than one.
    #[error("`{table}`[{index}] is claimed by {claims} ranges, expected exactly one")]
    NotPartitioned {
        table: RecordKind,
        index: usize,
        claims: usize,
    },

    /// A node whose `cluster_index` is not the cluster whose range holds it.
    #[error("{kind} node {node} records cluster {recorded} but lies in the range of cluster {actual}")]
    ClusterMismatch {
        kind: NodeKind,
        node: usize,
        recorded: u32,
        actual: usize,
    },

    /// An edge record pointing past the end of its peer node table.
    #[error("`{table}`[{edge}] points at node {target}, past the end of {len} nodes")]
    DanglingEdge {
        table: EdgeTable,
        edge: usize,
        target: u32,
        len: usize,
    },

    /// Front and reverse tables disagree on how often `from -> to` occurs.
    #[error("edge {from} -> {to} occurs {front} times in front tables and {reverse} times in reverse tables")]
    DualityMismatch {
        from: Owner,
        to: Owner,
        front: usize,
        reverse: usize,
    },

    /// A parent index past the end of the cluster table.
    #[error("cluster {cluster} has parent {parent}, past the end of {len} clusters")]
    ParentOutOfBounds {
        cluster: usize,
        parent: u32,
        len: usize,
    },

    /// A cluster inside a child range that names a different parent.
    #[error("cluster {child} is listed as a child of {listed_by} but records parent {parent}")]
    ParentMismatch {
        child: usize,
        listed_by: usize,
        parent: u32,
    },

    /// A cluster missing from its parent's child range.
    #[error("cluster {child} records parent {parent}, whose child range does not include it")]
    UnlistedChild { child: usize, parent: u32 },

    /// A parent chain that loops.
    #[error("cluster {cluster} is its own ancestor")]
    HierarchyCycle { cluster: usize },

    /// A keyframe with non-finite times or `start >= end`.
    #[error("{owner} keyframe {keyframe} has interval [{start}, {end})")]
    KeyframeInterval {
        owner: Owner,
        keyframe: usize,
        start: f32,
        end: f32,
    },

    /// A keyframe starting before its predecessor ends.
    #[error("{owner} keyframe {keyframe} starts at {start} before the previous one ends at {previous_end}")]
    KeyframeOrder {
        owner: Owner,
        keyframe: usize,
        previous_end: f32,
        start: f32,
    },

    /// A label span past the end of the label blob.
    #[error("{owner} label spans {start}..{end} of a {blob_len}-byte label blob")]
    LabelOutOfBounds {
        owner: Owner,
        start: usize,
        end: usize,
        blob_len: usize,
    },
}

/// Errors that abandon a graph build.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssemblyError {
    /// A record value did not fit its field.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The store refused an allocation or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An input parent index with no such cluster.
    #[error("cluster {cluster} names parent {parent}, but there are only {len} clusters")]
    InvalidParent {
        cluster: usize,
        parent: usize,
        len: usize,
    },

    /// Input parent links that loop.
    #[error("cluster {cluster} is part of a parent cycle")]
    HierarchyCycle { cluster: usize },

    /// An input edge to a node that does not exist.
    #[error("{owner} has an edge to {target}, which does not exist")]
    UnknownNode { owner: InputOwner, target: InputOwner },

    /// A count too large for its record field.
    #[error("{owner} has {count} {what}, at most {max} fit")]
    CountOverflow {
        what: &'static str,
        owner: InputOwner,
        count: usize,
        max: usize,
    },

    /// A label longer than a `u8` size can describe.
    #[error("{owner} has a {len}-byte label, at most 255 bytes fit")]
    LabelTooLong { owner: InputOwner, len: usize },

    /// An input keyframe with non-finite times or `start >= end`.
    #[error("{owner} keyframe {index} has interval [{start}, {end}), expected finite times with start < end")]
    KeyframeInterval {
        owner: InputOwner,
        index: usize,
        start: f32,
        end: f32,
    },

    /// Input keyframes that overlap once sorted.
    #[error("{owner} keyframe {index} starts at {start}, before the previous keyframe ends at {previous_end}")]
    KeyframeOverlap {
        owner: InputOwner,
        index: usize,
        previous_end: f32,
        start: f32,
    },

    /// The assembled store failed validation.
    #[error("assembled graph violates {} invariant(s): {}", .0.len(), summarize(.0))]
    InvariantViolations(Vec<InvariantViolation>),
}

fn summarize(violations: &[InvariantViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors loading assembly options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The options file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The options document is not valid TOML for `AssemblyOptions`.
    #[error("invalid assembly options: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AssemblyError>;
