//! Invariant checks over an assembled store.
//!
//! Checks:
//! - every allocated slot is populated
//! - annotation tables are empty or one slot per owner
//! - cluster node ranges are in bounds and partition the node arrays
//! - each node's `cluster_index` names the cluster whose range holds it
//! - node edge ranges are in bounds and partition each edge table, and every
//!   edge points at an existing node
//! - front and reverse tables describe the same edges
//! - hierarchy links are in bounds, agree in both directions and are acyclic
//! - keyframe ranges partition the keyframe tables, each keyframe has
//!   `start < end`, and an owner's keyframes do not overlap
//! - label spans lie inside the label blob

use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{InvariantViolation, Owner};
use crate::kind::{EdgeTable, NodeKind, RecordKind};
use crate::records::{
    ClusterExtra1, EdgeRecord, KeyframeRange, KeyframeRecord, LabelRef, NodeInfo, NodeRecord,
    NO_PARENT,
};
use crate::store::{CircuitStore, FlatArray, StoredRecord};

/// Check every invariant a reader of `store` relies on.
///
/// `label_blob_len` is the length of the label blob the store's label spans
/// point into. All violations are reported, not just the first.
pub fn validate(
    store: &CircuitStore,
    label_blob_len: usize,
) -> Result<(), Vec<InvariantViolation>> {
    let mut errors = Vec::new();

    // Nothing else is meaningful over unpopulated slots.
    for kind in RecordKind::ALL {
        let (populated, len) = (store.populated_count(kind), store.len(kind));
        if populated != len {
            errors.push(InvariantViolation::Unpopulated {
                kind,
                populated,
                len,
            });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let infos: [Vec<NodeInfo>; 2] = [
        node_infos(store.entry_nodes()),
        node_infos(store.exit_nodes()),
    ];

    check_node_ranges(store, &infos, &mut errors);
    check_edges(store, &infos, &mut errors);
    check_hierarchy(store, &mut errors);

    let clusters = store.clusters().len();
    let (entries, exits) = (infos[0].len(), infos[1].len());
    check_keyframes(
        store.cluster_extra2(),
        store.cluster_keyframes(),
        clusters,
        Owner::Cluster,
        &mut errors,
    );
    check_keyframes(
        store.entry_node_extra1(),
        store.entry_node_keyframes(),
        entries,
        |i| Owner::node(NodeKind::Entry, i),
        &mut errors,
    );
    check_keyframes(
        store.exit_node_extra1(),
        store.exit_node_keyframes(),
        exits,
        |i| Owner::node(NodeKind::Exit, i),
        &mut errors,
    );

    check_labels(
        store.cluster_extra3(),
        clusters,
        Owner::Cluster,
        label_blob_len,
        &mut errors,
    );
    check_labels(
        store.entry_node_extra2(),
        entries,
        |i| Owner::node(NodeKind::Entry, i),
        label_blob_len,
        &mut errors,
    );
    check_labels(
        store.exit_node_extra2(),
        exits,
        |i| Owner::node(NodeKind::Exit, i),
        label_blob_len,
        &mut errors,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn node_infos<N: NodeRecord>(table: &FlatArray<N>) -> Vec<NodeInfo> {
    table.as_slice().iter().map(NodeRecord::info).collect()
}

/// Tracks which ranges claim each slot of one table.
struct Claims {
    table: RecordKind,
    owners: Vec<Option<Owner>>,
    counts: Vec<usize>,
}

impl Claims {
    fn new(table: RecordKind, len: usize) -> Self {
        Self {
            table,
            owners: vec![None; len],
            counts: vec![0; len],
        }
    }

    /// Claim `range` for `owner`. Returns false, and reports it, when the
    /// range runs past the end of the table.
    fn claim(
        &mut self,
        owner: Owner,
        range: Range<usize>,
        errors: &mut Vec<InvariantViolation>,
    ) -> bool {
        if range.end > self.counts.len() {
            errors.push(InvariantViolation::RangeOutOfBounds {
                owner,
                table: self.table,
                start: range.start,
                end: range.end,
                len: self.counts.len(),
            });
            return false;
        }
        for slot in range {
            self.counts[slot] += 1;
            self.owners[slot] = Some(owner);
        }
        true
    }

    /// The single owner of `slot`, if exactly one range claims it.
    fn owner(&self, slot: usize) -> Option<Owner> {
        (self.counts.get(slot) == Some(&1))
            .then(|| self.owners[slot])
            .flatten()
    }

    /// Report the first slot not claimed exactly once.
    fn finish(self, errors: &mut Vec<InvariantViolation>) {
        if let Some(index) = self.counts.iter().position(|&claims| claims != 1) {
            errors.push(InvariantViolation::NotPartitioned {
                table: self.table,
                index,
                claims: self.counts[index],
            });
        }
    }
}

fn check_node_ranges(
    store: &CircuitStore,
    infos: &[Vec<NodeInfo>; 2],
    errors: &mut Vec<InvariantViolation>,
) {
    let clusters = store.clusters().as_slice();
    for kind in NodeKind::ALL {
        let nodes = &infos[kind.index()];
        let mut claims = Claims::new(kind.record_kind(), nodes.len());
        for (index, cluster) in clusters.iter().enumerate() {
            claims.claim(Owner::Cluster(index), cluster.node_range(kind), errors);
        }

        for (node, info) in nodes.iter().enumerate() {
            if let Some(Owner::Cluster(actual)) = claims.owner(node) {
                let recorded = info.cluster_index();
                if recorded as usize != actual {
                    errors.push(InvariantViolation::ClusterMismatch {
                        kind,
                        node,
                        recorded,
                        actual,
                    });
                }
            }
        }
        claims.finish(errors);
    }
}

fn edge_targets<E: EdgeRecord + StoredRecord>(store: &CircuitStore) -> Vec<u32> {
    store
        .table::<E>()
        .as_slice()
        .iter()
        .map(EdgeRecord::node_index)
        .collect()
}

fn check_edges(
    store: &CircuitStore,
    infos: &[Vec<NodeInfo>; 2],
    errors: &mut Vec<InvariantViolation>,
) {
    use crate::records::{EntryEdgeFront, EntryEdgeReverse, ExitEdgeFront, ExitEdgeReverse};

    let targets: [Vec<u32>; 4] = [
        edge_targets::<EntryEdgeFront>(store),
        edge_targets::<EntryEdgeReverse>(store),
        edge_targets::<ExitEdgeFront>(store),
        edge_targets::<ExitEdgeReverse>(store),
    ];

    // (from, to) -> (front occurrences, reverse occurrences)
    let mut pairs: BTreeMap<(Owner, Owner), (usize, usize)> = BTreeMap::new();

    for table in EdgeTable::ALL {
        let records = &targets[table.index()];
        let peer = table.peer_kind();
        let peer_len = infos[peer.index()].len();
        for (edge, &target) in records.iter().enumerate() {
            if target as usize >= peer_len {
                errors.push(InvariantViolation::DanglingEdge {
                    table,
                    edge,
                    target,
                    len: peer_len,
                });
            }
        }

        let mut claims = Claims::new(table.record_kind(), records.len());
        for kind in NodeKind::ALL {
            for (index, info) in infos[kind.index()].iter().enumerate() {
                let owner = Owner::node(kind, index);
                let range = info.edge_range(table);
                if !claims.claim(owner, range.clone(), errors) {
                    continue;
                }
                for &target in &records[range] {
                    let peer_node = Owner::node(peer, target as usize);
                    if table.is_front() {
                        pairs.entry((owner, peer_node)).or_default().0 += 1;
                    } else {
                        pairs.entry((peer_node, owner)).or_default().1 += 1;
                    }
                }
            }
        }
        claims.finish(errors);
    }

    for ((from, to), (front, reverse)) in pairs {
        if front != reverse {
            errors.push(InvariantViolation::DualityMismatch {
                from,
                to,
                front,
                reverse,
            });
        }
    }
}

fn check_hierarchy(store: &CircuitStore, errors: &mut Vec<InvariantViolation>) {
    let len = store.clusters().len();
    let links: &[ClusterExtra1] = store.cluster_extra1().as_slice();
    if links.is_empty() {
        return;
    }
    if links.len() != len {
        errors.push(InvariantViolation::AnnotationLength {
            kind: RecordKind::ClusterExtra1,
            len: links.len(),
            expected: len,
        });
        return;
    }

    let parent_of = |cluster: usize| -> Option<usize> {
        let parent = links[cluster].parent_cluster_index();
        (parent != NO_PARENT && (parent as usize) < len).then_some(parent as usize)
    };

    for (cluster, link) in links.iter().enumerate() {
        let parent = link.parent_cluster_index();
        if parent != NO_PARENT && parent as usize >= len {
            errors.push(InvariantViolation::ParentOutOfBounds {
                cluster,
                parent,
                len,
            });
        }
        if let Some(parent_index) = parent_of(cluster) {
            if !links[parent_index].child_range().contains(&cluster) {
                errors.push(InvariantViolation::UnlistedChild {
                    child: cluster,
                    parent,
                });
            }
        }

        let children = link.child_range();
        if children.end > len {
            errors.push(InvariantViolation::RangeOutOfBounds {
                owner: Owner::Cluster(cluster),
                table: RecordKind::Cluster,
                start: children.start,
                end: children.end,
                len,
            });
            continue;
        }
        for child in children {
            if parent_of(child) != Some(cluster) {
                errors.push(InvariantViolation::ParentMismatch {
                    child,
                    listed_by: cluster,
                    parent: links[child].parent_cluster_index(),
                });
            }
        }
    }

    // Walk parent chains, marking clusters done once their chain is known
    // to end at a root.
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }
    let mut marks = vec![Mark::Unvisited; len];
    for start in 0..len {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(cluster) = current {
            match marks[cluster] {
                Mark::Done => break,
                Mark::OnPath => {
                    errors.push(InvariantViolation::HierarchyCycle { cluster });
                    break;
                }
                Mark::Unvisited => {
                    marks[cluster] = Mark::OnPath;
                    path.push(cluster);
                    current = parent_of(cluster);
                }
            }
        }
        for cluster in path {
            marks[cluster] = Mark::Done;
        }
    }
}

fn check_keyframes<R, K>(
    ranges: &FlatArray<R>,
    keyframes: &FlatArray<K>,
    owner_len: usize,
    owner: impl Fn(usize) -> Owner,
    errors: &mut Vec<InvariantViolation>,
) where
    R: KeyframeRange,
    K: KeyframeRecord,
{
    let range_kind = ranges.kind();
    let ranges = ranges.as_slice();
    if !ranges.is_empty() && ranges.len() != owner_len {
        errors.push(InvariantViolation::AnnotationLength {
            kind: range_kind,
            len: ranges.len(),
            expected: owner_len,
        });
        return;
    }

    let mut claims = Claims::new(keyframes.kind(), keyframes.len());
    let keyframes = keyframes.as_slice();
    for (index, range_record) in ranges.iter().enumerate() {
        let range_owner = owner(index);
        let range = range_record.keyframe_range();
        if !claims.claim(range_owner, range.clone(), errors) {
            continue;
        }

        let mut previous_end: Option<f32> = None;
        for keyframe in range {
            let interval = keyframes[keyframe].time_interval();
            let (start, end) = (interval.start_time(), interval.end_time());
            if !(start.is_finite() && end.is_finite() && start < end) {
                errors.push(InvariantViolation::KeyframeInterval {
                    owner: range_owner,
                    keyframe,
                    start,
                    end,
                });
            }
            if let Some(previous_end) = previous_end {
                if start < previous_end {
                    errors.push(InvariantViolation::KeyframeOrder {
                        owner: range_owner,
                        keyframe,
                        previous_end,
                        start,
                    });
                }
            }
            previous_end = Some(end);
        }
    }
    claims.finish(errors);
}

fn check_labels<L: LabelRef>(
    labels: &FlatArray<L>,
    owner_len: usize,
    owner: impl Fn(usize) -> Owner,
    blob_len: usize,
    errors: &mut Vec<InvariantViolation>,
) {
    let kind = labels.kind();
    let labels = labels.as_slice();
    if !labels.is_empty() && labels.len() != owner_len {
        errors.push(InvariantViolation::AnnotationLength {
            kind,
            len: labels.len(),
            expected: owner_len,
        });
        return;
    }
    for (index, label) in labels.iter().enumerate() {
        let span = label.label_range();
        if span.end > blob_len {
            errors.push(InvariantViolation::LabelOutOfBounds {
                owner: owner(index),
                start: span.start,
                end: span.end,
                blob_len,
            });
        }
    }
}
