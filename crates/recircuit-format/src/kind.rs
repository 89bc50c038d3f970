//! Enumerations of the stored record kinds, node kinds and edge tables.

use std::fmt;

use serde::{Deserialize, Serialize};

use recircuit_layout::{PackedRecord, RecordLayout, SchemaError};

use crate::records::{
    Cluster, ClusterExtra1, ClusterExtra2, ClusterExtra3, ClusterKeyframe, EntryEdgeFront,
    EntryEdgeReverse, EntryNode, EntryNodeExtra1, EntryNodeExtra2, EntryNodeKeyframe,
    ExitEdgeFront, ExitEdgeReverse, ExitNode, ExitNodeExtra1, ExitNodeExtra2, ExitNodeKeyframe,
};

/// Every record kind that has its own flat array, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Cluster,
    ClusterExtra1,
    ClusterExtra2,
    ClusterExtra3,
    ClusterKeyframe,
    EntryNode,
    EntryNodeExtra1,
    EntryNodeExtra2,
    EntryNodeKeyframe,
    ExitNode,
    ExitNodeExtra1,
    ExitNodeExtra2,
    ExitNodeKeyframe,
    EntryEdgeFront,
    EntryEdgeReverse,
    ExitEdgeFront,
    ExitEdgeReverse,
}

impl RecordKind {
    pub const ALL: [RecordKind; 17] = [
        RecordKind::Cluster,
        RecordKind::ClusterExtra1,
        RecordKind::ClusterExtra2,
        RecordKind::ClusterExtra3,
        RecordKind::ClusterKeyframe,
        RecordKind::EntryNode,
        RecordKind::EntryNodeExtra1,
        RecordKind::EntryNodeExtra2,
        RecordKind::EntryNodeKeyframe,
        RecordKind::ExitNode,
        RecordKind::ExitNodeExtra1,
        RecordKind::ExitNodeExtra2,
        RecordKind::ExitNodeKeyframe,
        RecordKind::EntryEdgeFront,
        RecordKind::EntryEdgeReverse,
        RecordKind::ExitEdgeFront,
        RecordKind::ExitEdgeReverse,
    ];

    /// Name of the flat array holding this kind.
    pub fn array_name(self) -> &'static str {
        match self {
            RecordKind::Cluster => "clusters",
            RecordKind::ClusterExtra1 => "cluster_extra1_arr",
            RecordKind::ClusterExtra2 => "cluster_extra2_arr",
            RecordKind::ClusterExtra3 => "cluster_extra3_arr",
            RecordKind::ClusterKeyframe => "cluster_keyframes",
            RecordKind::EntryNode => "entry_nodes",
            RecordKind::EntryNodeExtra1 => "entry_node_extra1_arr",
            RecordKind::EntryNodeExtra2 => "entry_node_extra2_arr",
            RecordKind::EntryNodeKeyframe => "entry_node_keyframes",
            RecordKind::ExitNode => "exit_nodes",
            RecordKind::ExitNodeExtra1 => "exit_node_extra1_arr",
            RecordKind::ExitNodeExtra2 => "exit_node_extra2_arr",
            RecordKind::ExitNodeKeyframe => "exit_node_keyframes",
            RecordKind::EntryEdgeFront => "entry_edges_front",
            RecordKind::EntryEdgeReverse => "entry_edges_reverse",
            RecordKind::ExitEdgeFront => "exit_edges_front",
            RecordKind::ExitEdgeReverse => "exit_edges_reverse",
        }
    }

    /// Bytes per record.
    pub fn size_bytes(self) -> usize {
        match self {
            RecordKind::Cluster => Cluster::SIZE_BYTES,
            RecordKind::ClusterExtra1 => ClusterExtra1::SIZE_BYTES,
            RecordKind::ClusterExtra2 => ClusterExtra2::SIZE_BYTES,
            RecordKind::ClusterExtra3 => ClusterExtra3::SIZE_BYTES,
            RecordKind::ClusterKeyframe => ClusterKeyframe::SIZE_BYTES,
            RecordKind::EntryNode => EntryNode::SIZE_BYTES,
            RecordKind::EntryNodeExtra1 => EntryNodeExtra1::SIZE_BYTES,
            RecordKind::EntryNodeExtra2 => EntryNodeExtra2::SIZE_BYTES,
            RecordKind::EntryNodeKeyframe => EntryNodeKeyframe::SIZE_BYTES,
            RecordKind::ExitNode => ExitNode::SIZE_BYTES,
            RecordKind::ExitNodeExtra1 => ExitNodeExtra1::SIZE_BYTES,
            RecordKind::ExitNodeExtra2 => ExitNodeExtra2::SIZE_BYTES,
            RecordKind::ExitNodeKeyframe => ExitNodeKeyframe::SIZE_BYTES,
            RecordKind::EntryEdgeFront => EntryEdgeFront::SIZE_BYTES,
            RecordKind::EntryEdgeReverse => EntryEdgeReverse::SIZE_BYTES,
            RecordKind::ExitEdgeFront => ExitEdgeFront::SIZE_BYTES,
            RecordKind::ExitEdgeReverse => ExitEdgeReverse::SIZE_BYTES,
        }
    }

    /// The compiled type descriptor for this kind.
    pub fn layout(self) -> Result<RecordLayout, SchemaError> {
        match self {
            RecordKind::Cluster => Cluster::layout(),
            RecordKind::ClusterExtra1 => ClusterExtra1::layout(),
            RecordKind::ClusterExtra2 => ClusterExtra2::layout(),
            RecordKind::ClusterExtra3 => ClusterExtra3::layout(),
            RecordKind::ClusterKeyframe => ClusterKeyframe::layout(),
            RecordKind::EntryNode => EntryNode::layout(),
            RecordKind::EntryNodeExtra1 => EntryNodeExtra1::layout(),
            RecordKind::EntryNodeExtra2 => EntryNodeExtra2::layout(),
            RecordKind::EntryNodeKeyframe => EntryNodeKeyframe::layout(),
            RecordKind::ExitNode => ExitNode::layout(),
            RecordKind::ExitNodeExtra1 => ExitNodeExtra1::layout(),
            RecordKind::ExitNodeExtra2 => ExitNodeExtra2::layout(),
            RecordKind::ExitNodeKeyframe => ExitNodeKeyframe::layout(),
            RecordKind::EntryEdgeFront => EntryEdgeFront::layout(),
            RecordKind::EntryEdgeReverse => EntryEdgeReverse::layout(),
            RecordKind::ExitEdgeFront => ExitEdgeFront::layout(),
            RecordKind::ExitEdgeReverse => ExitEdgeReverse::layout(),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.array_name())
    }
}

/// Which side of a cluster a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Entry,
    Exit,
}

impl NodeKind {
    pub const ALL: [NodeKind; 2] = [NodeKind::Entry, NodeKind::Exit];

    /// The record kind of the node array.
    pub fn record_kind(self) -> RecordKind {
        match self {
            NodeKind::Entry => RecordKind::EntryNode,
            NodeKind::Exit => RecordKind::ExitNode,
        }
    }

    /// Position in [`NodeKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Entry => f.write_str("entry"),
            NodeKind::Exit => f.write_str("exit"),
        }
    }
}

/// The four edge tables.
///
/// A table is named after the kind of node its records point at: front
/// tables hold outgoing edges keyed by target kind, reverse tables hold
/// incoming edges keyed by source kind. Every node, entry or exit, owns one
/// range in each of the four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeTable {
    EntryFront,
    EntryReverse,
    ExitFront,
    ExitReverse,
}

impl EdgeTable {
    pub const ALL: [EdgeTable; 4] = [
        EdgeTable::EntryFront,
        EdgeTable::EntryReverse,
        EdgeTable::ExitFront,
        EdgeTable::ExitReverse,
    ];

    /// Table holding outgoing edges towards nodes of `target` kind.
    pub fn front(target: NodeKind) -> Self {
        match target {
            NodeKind::Entry => EdgeTable::EntryFront,
            NodeKind::Exit => EdgeTable::ExitFront,
        }
    }

    /// Table holding incoming edges from nodes of `source` kind.
    pub fn reverse(source: NodeKind) -> Self {
        match source {
            NodeKind::Entry => EdgeTable::EntryReverse,
            NodeKind::Exit => EdgeTable::ExitReverse,
        }
    }

    /// Kind of node the table's records point at.
    pub fn peer_kind(self) -> NodeKind {
        match self {
            EdgeTable::EntryFront | EdgeTable::EntryReverse => NodeKind::Entry,
            EdgeTable::ExitFront | EdgeTable::ExitReverse => NodeKind::Exit,
        }
    }

    pub fn is_front(self) -> bool {
        matches!(self, EdgeTable::EntryFront | EdgeTable::ExitFront)
    }

    /// The table holding the other half of each edge in this one, seen from
    /// a node of `owner` kind.
    pub fn dual(self, owner: NodeKind) -> Self {
        if self.is_front() {
            EdgeTable::reverse(owner)
        } else {
            EdgeTable::front(owner)
        }
    }

    pub fn record_kind(self) -> RecordKind {
        match self {
            EdgeTable::EntryFront => RecordKind::EntryEdgeFront,
            EdgeTable::EntryReverse => RecordKind::EntryEdgeReverse,
            EdgeTable::ExitFront => RecordKind::ExitEdgeFront,
            EdgeTable::ExitReverse => RecordKind::ExitEdgeReverse,
        }
    }

    /// Position in [`EdgeTable::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EdgeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_kind().array_name())
    }
}
