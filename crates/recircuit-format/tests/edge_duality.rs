//! Property tests over randomly generated circuits.

use proptest::prelude::*;
use proptest::sample::Index;
use recircuit_format::{
    assemble, AssemblyOptions, CircuitInput, ClusterInput, EdgeTable, NodeInput, NodeKind,
    NodeRef,
};

#[derive(Debug, Clone)]
struct Shape {
    /// `(parent, entry nodes, exit nodes)`, parents pointing at earlier clusters.
    clusters: Vec<(Option<Index>, usize, usize)>,
    edges: Vec<(Index, Index)>,
}

fn shape_strategy() -> impl Strategy<Value = Shape> {
    (
        prop::collection::vec((any::<Option<Index>>(), 0usize..4, 0usize..4), 1..8),
        prop::collection::vec((any::<Index>(), any::<Index>()), 0..40),
    )
        .prop_map(|(clusters, edges)| Shape { clusters, edges })
}

fn build(shape: &Shape) -> CircuitInput {
    let mut input = CircuitInput::new();
    let mut nodes = Vec::new();
    for (i, &(parent, entries, exits)) in shape.clusters.iter().enumerate() {
        let mut cluster = ClusterInput::new();
        if let Some(parent) = parent.filter(|_| i > 0) {
            cluster = cluster.with_parent(parent.index(i));
        }
        for node in 0..entries {
            cluster = cluster.with_entry_node(NodeInput::new());
            nodes.push(NodeRef::entry(i, node));
        }
        for node in 0..exits {
            cluster = cluster.with_exit_node(NodeInput::new());
            nodes.push(NodeRef::exit(i, node));
        }
        input.add_cluster(cluster);
    }

    if !nodes.is_empty() {
        for (source, target) in &shape.edges {
            let source = nodes[source.index(nodes.len())];
            let target = nodes[target.index(nodes.len())];
            let cluster = &mut input.clusters[source.cluster];
            let list = match source.kind {
                NodeKind::Entry => &mut cluster.entry_nodes,
                NodeKind::Exit => &mut cluster.exit_nodes,
            };
            list[source.node].edges.push(target);
        }
    }
    input
}

proptest! {
    // Every edge appears once in a front table and once in the dual reverse table.
    #[test]
    fn front_and_reverse_tables_agree(shape in shape_strategy()) {
        let input = build(&shape);
        let circuit = assemble(&input, &AssemblyOptions::default()).unwrap();

        let mut forward = Vec::new();
        let mut backward = Vec::new();
        for kind in NodeKind::ALL {
            for node in 0..circuit.node_count(kind) {
                let this = (kind, node as u32);
                for (peer, index) in circuit.successors(kind, node).unwrap() {
                    forward.push((this, (peer, index)));
                }
                for (peer, index) in circuit.predecessors(kind, node).unwrap() {
                    backward.push(((peer, index), this));
                }
            }
        }
        forward.sort();
        backward.sort();
        prop_assert_eq!(forward.len(), input.edge_count());
        prop_assert_eq!(forward, backward);
    }

    // Each node table is partitioned by the clusters' node ranges, and each
    // node records the cluster that owns it.
    #[test]
    fn clusters_partition_their_nodes(shape in shape_strategy()) {
        let input = build(&shape);
        let circuit = assemble(&input, &AssemblyOptions::default()).unwrap();

        for kind in NodeKind::ALL {
            let mut next = 0;
            for cluster in 0..circuit.cluster_count() {
                let range = circuit.cluster(cluster).unwrap().node_range(kind);
                prop_assert_eq!(range.start, next);
                for node in range.clone() {
                    let info = circuit.node_info(kind, node).unwrap();
                    prop_assert_eq!(info.cluster_index() as usize, cluster);
                }
                next = range.end;
            }
            prop_assert_eq!(next, circuit.node_count(kind));
        }
    }

    // Input addresses survive the trip through stored indices.
    #[test]
    fn node_addresses_round_trip(shape in shape_strategy()) {
        let input = build(&shape);
        let circuit = assemble(&input, &AssemblyOptions::default()).unwrap();

        for kind in NodeKind::ALL {
            for index in 0..circuit.node_count(kind) {
                let node = circuit.node_ref(kind, index).unwrap();
                prop_assert_eq!(circuit.node_index(node), Some(index as u32));
                let targets = circuit
                    .edge_targets(kind, index, EdgeTable::front(NodeKind::Exit))
                    .unwrap();
                let expected = input
                    .node(node)
                    .unwrap()
                    .edges
                    .iter()
                    .filter(|t| t.kind == NodeKind::Exit)
                    .map(|&t| circuit.node_index(t).unwrap())
                    .collect::<Vec<_>>();
                prop_assert_eq!(targets, expected);
            }
        }
    }
}
