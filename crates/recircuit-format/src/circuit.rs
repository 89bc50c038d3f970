//! Read-only view over an assembled circuit.

use std::ops::Range;

use crate::assemble::Placement;
use crate::geometry::{Circle, Rectangle};
use crate::input::NodeRef;
use crate::kind::{EdgeTable, NodeKind};
use crate::records::{
    Cluster, EdgeRecord, EntryNode, ExitNode, KeyframeRange, KeyframeRecord, LabelRef, NodeInfo,
    NodeRecord, NO_PARENT,
};
use crate::store::{CircuitStore, FlatArray, Manifest};

/// A fully populated, validated circuit.
///
/// Immutable once built; share it freely across threads. Rebuilding means
/// running [`assemble`](crate::assemble) again.
#[derive(Debug, Clone)]
pub struct AssembledCircuit {
    store: CircuitStore,
    labels: Vec<u8>,
    placement: Placement,
}

impl AssembledCircuit {
    pub(crate) fn new(store: CircuitStore, labels: Vec<u8>, placement: Placement) -> Self {
        Self {
            store,
            labels,
            placement,
        }
    }

    pub fn store(&self) -> &CircuitStore {
        &self.store
    }

    /// Give up the view and take the tables.
    pub fn into_parts(self) -> (CircuitStore, Vec<u8>) {
        (self.store, self.labels)
    }

    /// UTF-8 label bytes, concatenated in owner order: clusters, entry
    /// nodes, exit nodes.
    pub fn label_blob(&self) -> &[u8] {
        &self.labels
    }

    pub fn manifest(&self) -> recircuit_layout::Result<Manifest> {
        self.store.manifest()
    }

    pub fn cluster_count(&self) -> usize {
        self.store.clusters().len()
    }

    pub fn node_count(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Entry => self.store.entry_nodes().len(),
            NodeKind::Exit => self.store.exit_nodes().len(),
        }
    }

    /// Stored index of the input cluster `input_index`.
    pub fn stored_cluster(&self, input_index: usize) -> Option<u32> {
        self.placement.slots.get(input_index).copied()
    }

    /// Input index of the stored cluster `index`.
    pub fn input_cluster(&self, index: usize) -> Option<usize> {
        self.placement.order.get(index).copied()
    }

    /// Stored index of an input node.
    pub fn node_index(&self, node: NodeRef) -> Option<u32> {
        let cluster = self.cluster(*self.placement.slots.get(node.cluster)? as usize)?;
        (node.node < usize::from(cluster.node_count(node.kind)))
            .then(|| self.placement.node_index(node))
    }

    /// Input address of a stored node.
    pub fn node_ref(&self, kind: NodeKind, index: usize) -> Option<NodeRef> {
        self.placement.refs[kind.index()].get(index).copied()
    }

    pub fn cluster(&self, index: usize) -> Option<Cluster> {
        self.store.clusters().as_slice().get(index).copied()
    }

    pub fn node_info(&self, kind: NodeKind, index: usize) -> Option<NodeInfo> {
        match kind {
            NodeKind::Entry => node_info(self.store.entry_nodes(), index),
            NodeKind::Exit => node_info(self.store.exit_nodes(), index),
        }
    }

    pub fn cluster_entry_nodes(&self, cluster: usize) -> Option<&[EntryNode]> {
        let range = self.cluster(cluster)?.node_range(NodeKind::Entry);
        self.store.entry_nodes().as_slice().get(range)
    }

    pub fn cluster_exit_nodes(&self, cluster: usize) -> Option<&[ExitNode]> {
        let range = self.cluster(cluster)?.node_range(NodeKind::Exit);
        self.store.exit_nodes().as_slice().get(range)
    }

    /// Peer node indices in a node's range of `table`.
    pub fn edge_targets(&self, kind: NodeKind, node: usize, table: EdgeTable) -> Option<Vec<u32>> {
        let range = self.node_info(kind, node)?.edge_range(table);
        let store = &self.store;
        match table {
            EdgeTable::EntryFront => targets(store.entry_edges_front(), range),
            EdgeTable::EntryReverse => targets(store.entry_edges_reverse(), range),
            EdgeTable::ExitFront => targets(store.exit_edges_front(), range),
            EdgeTable::ExitReverse => targets(store.exit_edges_reverse(), range),
        }
    }

    /// Targets of a node's outgoing edges: entry nodes first, then exit nodes.
    pub fn successors(&self, kind: NodeKind, node: usize) -> Option<Vec<(NodeKind, u32)>> {
        self.neighbours(kind, node, EdgeTable::front)
    }

    /// Sources of a node's incoming edges: entry nodes first, then exit nodes.
    pub fn predecessors(&self, kind: NodeKind, node: usize) -> Option<Vec<(NodeKind, u32)>> {
        self.neighbours(kind, node, EdgeTable::reverse)
    }

    fn neighbours(
        &self,
        kind: NodeKind,
        node: usize,
        table_for: fn(NodeKind) -> EdgeTable,
    ) -> Option<Vec<(NodeKind, u32)>> {
        let mut out = Vec::new();
        for peer in NodeKind::ALL {
            let peers = self.edge_targets(kind, node, table_for(peer))?;
            out.extend(peers.into_iter().map(|index| (peer, index)));
        }
        Some(out)
    }

    /// Stored parent of a cluster; `None` for roots or when no hierarchy
    /// was emitted.
    pub fn parent(&self, cluster: usize) -> Option<u32> {
        let link = self.store.cluster_extra1().as_slice().get(cluster)?;
        let parent = link.parent_cluster_index();
        (parent != NO_PARENT).then_some(parent)
    }

    /// Stored indices of a cluster's children.
    pub fn children(&self, cluster: usize) -> Option<Range<usize>> {
        let link = self.store.cluster_extra1().as_slice().get(cluster)?;
        Some(link.child_range())
    }

    /// A cluster's label, if labels were emitted and it has a non-empty one.
    pub fn cluster_label(&self, cluster: usize) -> Option<&str> {
        self.label(self.store.cluster_extra3(), cluster)
    }

    pub fn node_label(&self, kind: NodeKind, node: usize) -> Option<&str> {
        match kind {
            NodeKind::Entry => self.label(self.store.entry_node_extra2(), node),
            NodeKind::Exit => self.label(self.store.exit_node_extra2(), node),
        }
    }

    fn label<L: LabelRef>(&self, table: &FlatArray<L>, owner: usize) -> Option<&str> {
        let span = table.as_slice().get(owner)?.label_range();
        if span.is_empty() {
            return None;
        }
        std::str::from_utf8(self.labels.get(span)?).ok()
    }

    /// The cluster's rectangle at time `t`, or `None` when no keyframe
    /// covers `t`.
    pub fn cluster_territory_at(&self, cluster: usize, t: f32) -> Option<Rectangle> {
        territory_at(
            self.store.cluster_extra2(),
            self.store.cluster_keyframes(),
            cluster,
            t,
        )
    }

    pub fn entry_node_territory_at(&self, node: usize, t: f32) -> Option<Circle> {
        territory_at(
            self.store.entry_node_extra1(),
            self.store.entry_node_keyframes(),
            node,
            t,
        )
    }

    pub fn exit_node_territory_at(&self, node: usize, t: f32) -> Option<Circle> {
        territory_at(
            self.store.exit_node_extra1(),
            self.store.exit_node_keyframes(),
            node,
            t,
        )
    }
}

fn node_info<N: NodeRecord>(table: &FlatArray<N>, index: usize) -> Option<NodeInfo> {
    table.as_slice().get(index).map(NodeRecord::info)
}

fn targets<E: EdgeRecord>(table: &FlatArray<E>, range: Range<usize>) -> Option<Vec<u32>> {
    let records = table.as_slice().get(range)?;
    Some(records.iter().map(EdgeRecord::node_index).collect())
}

/// Binary search an owner's keyframes, which are sorted by start time and
/// do not overlap, for the one covering `t`.
fn territory_at<R, K>(
    ranges: &FlatArray<R>,
    keyframes: &FlatArray<K>,
    owner: usize,
    t: f32,
) -> Option<K::Territory>
where
    R: KeyframeRange,
    K: KeyframeRecord,
{
    let range = ranges.as_slice().get(owner)?.keyframe_range();
    let keyframes = keyframes.as_slice().get(range)?;
    let after = keyframes.partition_point(|k| k.time_interval().start_time() <= t);
    keyframes.get(after.checked_sub(1)?)?.territory_at(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuits_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AssembledCircuit>();
    }
}
