//! Graph assembly: flatten a [`CircuitInput`] into a [`CircuitStore`].
//!
//! Clusters are stored in breadth-first order over the parent forest, so the
//! children of every cluster form one contiguous block. Nodes are stored in
//! cluster order, one block per cluster and kind. Edge ranges are assigned
//! over all entry nodes, then all exit nodes, in stored order.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::circuit::AssembledCircuit;
use crate::config::AssemblyOptions;
use crate::error::{AssemblyError, Result, StoreError};
use crate::input::{CircuitInput, InputOwner, KeyframeInput, NodeRef};
use crate::kind::{EdgeTable, NodeKind, RecordKind};
use crate::records::{
    Cluster, ClusterExtra1, ClusterExtra2, ClusterExtra3, ClusterKeyframe, EdgeRecord,
    EntryEdgeFront, EntryEdgeReverse, EntryNode, EntryNodeExtra1, EntryNodeExtra2,
    EntryNodeKeyframe, ExitEdgeFront, ExitEdgeReverse, ExitNode, ExitNodeExtra1, ExitNodeExtra2,
    ExitNodeKeyframe, IntervalInfo, KeyframeRange, KeyframeRecord, LabelRef, NodeInfo, NodeRecord,
    NO_PARENT,
};
use crate::store::{CircuitStore, StoredRecord, MAX_RECORDS};
use crate::validate::validate;

/// Per node kind, indexed by [`NodeKind::index`].
type PerKind<T> = [T; 2];

/// Per edge table, indexed by [`EdgeTable::index`].
type PerTable<T> = [T; 4];

/// Where pass 1 put every cluster and node.
#[derive(Debug, Clone)]
pub(crate) struct Placement {
    /// Stored cluster index to input cluster index.
    pub order: Vec<usize>,
    /// Input cluster index to stored cluster index.
    pub slots: Vec<u32>,
    /// Input children of each input cluster, in input order.
    pub children: Vec<Vec<usize>>,
    /// First stored node of each input cluster.
    pub bases: PerKind<Vec<u32>>,
    /// Input address of each stored node.
    pub refs: PerKind<Vec<NodeRef>>,
}

impl Placement {
    pub fn node_index(&self, node: NodeRef) -> u32 {
        self.bases[node.kind.index()][node.cluster] + node.node as u32
    }
}

/// A directed edge between stored nodes.
#[derive(Debug, Clone, Copy)]
struct Edge {
    source: (NodeKind, u32),
    target: (NodeKind, u32),
}

/// Flatten `input` into a validated, fully populated store.
///
/// Nothing is returned unless every table is populated and every invariant
/// checked by [`validate`] holds; a failed build is dropped whole.
pub fn assemble(input: &CircuitInput, options: &AssemblyOptions) -> Result<AssembledCircuit> {
    let result = build(input, options);
    if let Err(error) = &result {
        warn!(%error, clusters = input.clusters.len(), "circuit assembly rejected");
    }
    result
}

fn build(input: &CircuitInput, options: &AssemblyOptions) -> Result<AssembledCircuit> {
    let mut store = CircuitStore::new();

    // Pass 1: cluster order and node blocks
    let placement = place_nodes(input, &mut store)?;
    debug!(
        clusters = placement.order.len(),
        entry_nodes = placement.refs[0].len(),
        exit_nodes = placement.refs[1].len(),
        "placed clusters and nodes"
    );

    // Pass 2: edge counts and ranges
    let edges = collect_edges(input, &placement)?;
    let firsts = place_edges(&placement, &edges, &mut store)?;
    debug!(edges = edges.len(), "assigned edge ranges");

    // Pass 3: front records, then reverse records once every index is final
    write_edges(&edges, &firsts, &mut store)?;

    // Pass 4: annotations
    if options
        .hierarchy
        .resolve(input.clusters.iter().any(|c| c.parent.is_some()))
    {
        write_hierarchy(input, &placement, &mut store)?;
    }
    if options.keyframes.resolve(has_keyframes(input)) {
        let keyframes = write_all_keyframes(input, &placement, &mut store)?;
        debug!(keyframes, "wrote keyframes");
    }
    let mut labels = Vec::new();
    if options.labels.resolve(has_labels(input)) {
        write_all_labels(input, &placement, &mut store, &mut labels)?;
        debug!(label_bytes = labels.len(), "wrote labels");
    }

    if let Err(violations) = validate(&store, labels.len()) {
        return Err(AssemblyError::InvariantViolations(violations));
    }
    debug!(
        clusters = store.len(RecordKind::Cluster),
        bytes = store.manifest().map(|m| m.total_bytes()).unwrap_or(0),
        "assembled circuit"
    );
    Ok(AssembledCircuit::new(store, labels, placement))
}

fn to_index(kind: RecordKind, value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        StoreError::CapacityExceeded {
            kind,
            requested: value,
            max: MAX_RECORDS,
        }
        .into()
    })
}

fn count_u16(count: usize, what: &'static str, owner: InputOwner) -> Result<u16> {
    u16::try_from(count).map_err(|_| AssemblyError::CountOverflow {
        what,
        owner,
        count,
        max: u16::MAX.into(),
    })
}

fn count_u8(count: usize, what: &'static str, owner: InputOwner) -> Result<u8> {
    u8::try_from(count).map_err(|_| AssemblyError::CountOverflow {
        what,
        owner,
        count,
        max: u8::MAX.into(),
    })
}

/// Breadth-first order over the parent forest: roots in input order, then
/// each cluster's children in input order.
fn cluster_order(input: &CircuitInput) -> Result<(Vec<usize>, Vec<Vec<usize>>)> {
    let len = input.clusters.len();
    let mut children = vec![Vec::new(); len];
    let mut roots = VecDeque::new();
    for (cluster, input_cluster) in input.clusters.iter().enumerate() {
        match input_cluster.parent {
            None => roots.push_back(cluster),
            Some(parent) if parent >= len => {
                return Err(AssemblyError::InvalidParent {
                    cluster,
                    parent,
                    len,
                })
            }
            Some(parent) if parent == cluster => {
                return Err(AssemblyError::HierarchyCycle { cluster })
            }
            Some(parent) => children[parent].push(cluster),
        }
    }

    let mut order = Vec::with_capacity(len);
    let mut queue = roots;
    while let Some(cluster) = queue.pop_front() {
        order.push(cluster);
        queue.extend(children[cluster].iter().copied());
    }

    // Anything unreached hangs off a cycle.
    if order.len() < len {
        let mut reached = vec![false; len];
        for &cluster in &order {
            reached[cluster] = true;
        }
        let cluster = reached.iter().position(|r| !r).unwrap_or_default();
        return Err(AssemblyError::HierarchyCycle { cluster });
    }
    Ok((order, children))
}

fn place_nodes(input: &CircuitInput, store: &mut CircuitStore) -> Result<Placement> {
    let (order, children) = cluster_order(input)?;
    let len = order.len();
    store.allocate(RecordKind::Cluster, len)?;

    let mut slots = vec![0u32; len];
    for (stored, &cluster) in order.iter().enumerate() {
        slots[cluster] = to_index(RecordKind::Cluster, stored)?;
    }

    let mut bases = [vec![0u32; len], vec![0u32; len]];
    let mut refs: PerKind<Vec<NodeRef>> = [Vec::new(), Vec::new()];
    for (stored, &cluster) in order.iter().enumerate() {
        let input_cluster = &input.clusters[cluster];
        let mut blocks = [(0u16, 0u32); 2];
        for kind in NodeKind::ALL {
            let k = kind.index();
            let nodes = input_cluster.nodes(kind);
            let what = match kind {
                NodeKind::Entry => "entry nodes",
                NodeKind::Exit => "exit nodes",
            };
            let count = count_u16(nodes.len(), what, InputOwner::Cluster(cluster))?;
            let first = to_index(kind.record_kind(), refs[k].len())?;
            bases[k][cluster] = first;
            refs[k].extend((0..nodes.len()).map(|node| NodeRef {
                kind,
                cluster,
                node,
            }));
            blocks[k] = (count, first);
        }
        let [(entry_count, entry_first), (exit_count, exit_first)] = blocks;
        store.clusters_mut().set(
            stored,
            Cluster::new(entry_count, entry_first, exit_count, exit_first)?,
        )?;
    }

    for kind in NodeKind::ALL {
        store.allocate(kind.record_kind(), refs[kind.index()].len())?;
    }

    Ok(Placement {
        order,
        slots,
        children,
        bases,
        refs,
    })
}

/// Every edge in stored source order, each source's edges in input order.
fn collect_edges(input: &CircuitInput, placement: &Placement) -> Result<Vec<Edge>> {
    let mut edges = Vec::with_capacity(input.edge_count());
    for kind in NodeKind::ALL {
        for &source_ref in &placement.refs[kind.index()] {
            let Some(node) = input.node(source_ref) else {
                continue;
            };
            let source = (kind, placement.node_index(source_ref));
            for &target_ref in &node.edges {
                if input.node(target_ref).is_none() {
                    return Err(AssemblyError::UnknownNode {
                        owner: InputOwner::Node(source_ref),
                        target: InputOwner::Node(target_ref),
                    });
                }
                edges.push(Edge {
                    source,
                    target: (target_ref.kind, placement.node_index(target_ref)),
                });
            }
        }
    }
    Ok(edges)
}

fn edge_what(table: EdgeTable) -> &'static str {
    match table {
        EdgeTable::EntryFront => "outgoing edges to entry nodes",
        EdgeTable::EntryReverse => "incoming edges from entry nodes",
        EdgeTable::ExitFront => "outgoing edges to exit nodes",
        EdgeTable::ExitReverse => "incoming edges from exit nodes",
    }
}

/// Count each node's edges per table, assign ranges, and write the node
/// records. Returns the first index of every range.
fn place_edges(
    placement: &Placement,
    edges: &[Edge],
    store: &mut CircuitStore,
) -> Result<PerKind<Vec<PerTable<u32>>>> {
    let mut counts: PerKind<Vec<PerTable<usize>>> = [
        vec![[0; 4]; placement.refs[0].len()],
        vec![[0; 4]; placement.refs[1].len()],
    ];
    for edge in edges {
        let (source_kind, source) = edge.source;
        let (target_kind, target) = edge.target;
        counts[source_kind.index()][source as usize][EdgeTable::front(target_kind).index()] += 1;
        counts[target_kind.index()][target as usize][EdgeTable::reverse(source_kind).index()] += 1;
    }

    let mut lens: PerTable<usize> = [0; 4];
    let mut firsts: PerKind<Vec<PerTable<u32>>> = [
        Vec::with_capacity(counts[0].len()),
        Vec::with_capacity(counts[1].len()),
    ];
    for kind in NodeKind::ALL {
        let k = kind.index();
        for (node, node_counts) in counts[k].iter().enumerate() {
            let node_ref = placement.refs[k][node];
            let mut ranges = [(0u16, 0u32); 4];
            let mut node_firsts = [0u32; 4];
            for table in EdgeTable::ALL {
                let t = table.index();
                let count = count_u16(node_counts[t], edge_what(table), InputOwner::Node(node_ref))?;
                let first = to_index(table.record_kind(), lens[t])?;
                ranges[t] = (count, first);
                node_firsts[t] = first;
                lens[t] += node_counts[t];
            }
            let info = NodeInfo::from_ranges(ranges, placement.slots[node_ref.cluster])?;
            match kind {
                NodeKind::Entry => put_node::<EntryNode>(store, node, info)?,
                NodeKind::Exit => put_node::<ExitNode>(store, node, info)?,
            }
            firsts[k].push(node_firsts);
        }
    }

    for table in EdgeTable::ALL {
        store.allocate(table.record_kind(), lens[table.index()])?;
    }
    Ok(firsts)
}

fn put_node<N: NodeRecord + StoredRecord>(
    store: &mut CircuitStore,
    slot: usize,
    info: NodeInfo,
) -> Result<()> {
    store.table_mut::<N>().set(slot, N::from_info(info)?)?;
    Ok(())
}

fn write_edges(
    edges: &[Edge],
    firsts: &PerKind<Vec<PerTable<u32>>>,
    store: &mut CircuitStore,
) -> Result<()> {
    let mut filled: PerKind<Vec<PerTable<usize>>> = [
        vec![[0; 4]; firsts[0].len()],
        vec![[0; 4]; firsts[1].len()],
    ];
    let mut next_slot = |(kind, node): (NodeKind, u32), table: EdgeTable| {
        let (k, n, t) = (kind.index(), node as usize, table.index());
        let slot = firsts[k][n][t] as usize + filled[k][n][t];
        filled[k][n][t] += 1;
        slot
    };

    for edge in edges {
        let table = EdgeTable::front(edge.target.0);
        let slot = next_slot(edge.source, table);
        put_edge(store, table, slot, edge.target.1)?;
    }
    for edge in edges {
        let table = EdgeTable::reverse(edge.source.0);
        let slot = next_slot(edge.target, table);
        put_edge(store, table, slot, edge.source.1)?;
    }
    Ok(())
}

fn put_edge(store: &mut CircuitStore, table: EdgeTable, slot: usize, node: u32) -> Result<()> {
    fn put<E: EdgeRecord + StoredRecord>(
        store: &mut CircuitStore,
        slot: usize,
        node: u32,
    ) -> Result<()> {
        store.table_mut::<E>().set(slot, E::to_node(node)?)?;
        Ok(())
    }

    match table {
        EdgeTable::EntryFront => put::<EntryEdgeFront>(store, slot, node),
        EdgeTable::EntryReverse => put::<EntryEdgeReverse>(store, slot, node),
        EdgeTable::ExitFront => put::<ExitEdgeFront>(store, slot, node),
        EdgeTable::ExitReverse => put::<ExitEdgeReverse>(store, slot, node),
    }
}

fn write_hierarchy(
    input: &CircuitInput,
    placement: &Placement,
    store: &mut CircuitStore,
) -> Result<()> {
    store.allocate(RecordKind::ClusterExtra1, placement.order.len())?;
    for (stored, &cluster) in placement.order.iter().enumerate() {
        let parent = input.clusters[cluster]
            .parent
            .map_or(NO_PARENT, |parent| placement.slots[parent]);
        let children = &placement.children[cluster];
        let count = count_u8(
            children.len(),
            "child clusters",
            InputOwner::Cluster(cluster),
        )?;
        // Breadth-first order stores siblings back to back.
        let first = children
            .first()
            .map_or(0, |&child| placement.slots[child]);
        store
            .cluster_extra1_mut()
            .set(stored, ClusterExtra1::new(parent, count, first)?)?;
    }
    Ok(())
}

fn has_keyframes(input: &CircuitInput) -> bool {
    input.clusters.iter().any(|c| {
        !c.keyframes.is_empty()
            || c.entry_nodes
                .iter()
                .chain(&c.exit_nodes)
                .any(|n| !n.keyframes.is_empty())
    })
}

fn has_labels(input: &CircuitInput) -> bool {
    input.clusters.iter().any(|c| {
        c.label.is_some()
            || c.entry_nodes
                .iter()
                .chain(&c.exit_nodes)
                .any(|n| n.label.is_some())
    })
}

/// Check and sort one owner's keyframes by start time.
fn sorted_keyframes<T: Copy>(
    owner: InputOwner,
    keyframes: &[KeyframeInput<T>],
) -> Result<Vec<KeyframeInput<T>>> {
    for (index, keyframe) in keyframes.iter().enumerate() {
        let (start, end) = (keyframe.start_time, keyframe.end_time);
        if !(start.is_finite() && end.is_finite() && start < end) {
            return Err(AssemblyError::KeyframeInterval {
                owner,
                index,
                start,
                end,
            });
        }
    }

    let mut sorted = keyframes.to_vec();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    for (index, pair) in sorted.windows(2).enumerate() {
        if pair[0].end_time > pair[1].start_time {
            return Err(AssemblyError::KeyframeOverlap {
                owner,
                index: index + 1,
                previous_end: pair[0].end_time,
                start: pair[1].start_time,
            });
        }
    }
    Ok(sorted)
}

/// Lay out the keyframes of one owner table and its range annotations.
/// Returns the number of keyframes written.
fn write_keyframes<'a, K, R>(
    store: &mut CircuitStore,
    owners: impl IntoIterator<Item = (InputOwner, &'a [KeyframeInput<K::Territory>])>,
) -> Result<usize>
where
    K: KeyframeRecord + StoredRecord,
    K::Territory: 'a,
    R: KeyframeRange + StoredRecord,
{
    let prepared = owners
        .into_iter()
        .map(|(owner, keyframes)| Ok((owner, sorted_keyframes(owner, keyframes)?)))
        .collect::<Result<Vec<_>>>()?;
    let total = prepared.iter().map(|(_, keyframes)| keyframes.len()).sum();
    store.table_mut::<K>().allocate(total)?;
    store.table_mut::<R>().allocate(prepared.len())?;

    let mut cursor = 0;
    for (slot, (owner, keyframes)) in prepared.iter().enumerate() {
        let count = count_u8(keyframes.len(), "keyframes", *owner)?;
        let first = to_index(K::RECORD_KIND, cursor)?;
        store.table_mut::<R>().set(slot, R::from_range(count, first)?)?;
        for keyframe in keyframes {
            let interval = IntervalInfo::new(keyframe.start_time, keyframe.end_time)?;
            let record = K::from_parts(keyframe.start, keyframe.end, interval)?;
            store.table_mut::<K>().set(cursor, record)?;
            cursor += 1;
        }
    }
    Ok(total)
}

fn write_all_keyframes(
    input: &CircuitInput,
    placement: &Placement,
    store: &mut CircuitStore,
) -> Result<usize> {
    let clusters = placement.order.iter().map(|&cluster| {
        (
            InputOwner::Cluster(cluster),
            input.clusters[cluster].keyframes.as_slice(),
        )
    });
    let node_keyframes = |kind: NodeKind| {
        placement.refs[kind.index()].iter().map(move |&node| {
            let keyframes = input.node(node).map_or(&[][..], |n| n.keyframes.as_slice());
            (InputOwner::Node(node), keyframes)
        })
    };

    let mut written = write_keyframes::<ClusterKeyframe, ClusterExtra2>(store, clusters)?;
    written += write_keyframes::<EntryNodeKeyframe, EntryNodeExtra1>(
        store,
        node_keyframes(NodeKind::Entry),
    )?;
    written += write_keyframes::<ExitNodeKeyframe, ExitNodeExtra1>(
        store,
        node_keyframes(NodeKind::Exit),
    )?;
    Ok(written)
}

/// Append each owner's label to `blob` and record its span.
fn write_labels<'a, L: LabelRef + StoredRecord>(
    store: &mut CircuitStore,
    blob: &mut Vec<u8>,
    owners: impl ExactSizeIterator<Item = (InputOwner, Option<&'a str>)>,
) -> Result<()> {
    store.table_mut::<L>().allocate(owners.len())?;
    for (slot, (owner, label)) in owners.enumerate() {
        let bytes = label.unwrap_or_default().as_bytes();
        let size = u8::try_from(bytes.len()).map_err(|_| AssemblyError::LabelTooLong {
            owner,
            len: bytes.len(),
        })?;
        let offset = u32::try_from(blob.len()).map_err(|_| AssemblyError::CountOverflow {
            what: "label blob bytes",
            owner,
            count: blob.len(),
            max: MAX_RECORDS,
        })?;
        blob.extend_from_slice(bytes);
        store.table_mut::<L>().set(slot, L::from_span(size, offset)?)?;
    }
    Ok(())
}

fn write_all_labels(
    input: &CircuitInput,
    placement: &Placement,
    store: &mut CircuitStore,
    blob: &mut Vec<u8>,
) -> Result<()> {
    let clusters = placement.order.iter().map(|&cluster| {
        (
            InputOwner::Cluster(cluster),
            input.clusters[cluster].label.as_deref(),
        )
    });
    let node_labels = |kind: NodeKind| {
        placement.refs[kind.index()].iter().map(move |&node| {
            let label = input.node(node).and_then(|n| n.label.as_deref());
            (InputOwner::Node(node), label)
        })
    };

    write_labels::<ClusterExtra3>(store, blob, clusters)?;
    write_labels::<EntryNodeExtra2>(store, blob, node_labels(NodeKind::Entry))?;
    write_labels::<ExitNodeExtra2>(store, blob, node_labels(NodeKind::Exit))?;
    Ok(())
}
