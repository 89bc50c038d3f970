//! Circuits and options read from text.

use recircuit_format::{
    assemble, AssemblyOptions, CircuitInput, Emission, NodeKind, NodeRef, Rectangle,
};

const CIRCUIT: &str = r#"
{
  "clusters": [
    {
      "label": "adder",
      "keyframes": [
        {
          "start": { "x": 0.0, "y": 0.0, "width": 4.0, "height": 2.0 },
          "end": { "x": 0.0, "y": 0.0, "width": 8.0, "height": 2.0 },
          "start_time": 0.0,
          "end_time": 1.0
        }
      ],
      "entry_nodes": [
        { "label": "a", "edges": [{ "kind": "exit", "cluster": 0, "node": 0 }] },
        { "label": "b", "edges": [{ "kind": "exit", "cluster": 0, "node": 0 }] }
      ],
      "exit_nodes": [
        { "label": "sum", "edges": [{ "kind": "entry", "cluster": 1, "node": 0 }] }
      ]
    },
    {
      "parent": 0,
      "entry_nodes": [{}]
    }
  ]
}
"#;

#[test]
fn assembles_a_json_circuit() {
    let input = CircuitInput::from_json_str(CIRCUIT).unwrap();
    assert_eq!(input.edge_count(), 3);

    let circuit = assemble(&input, &AssemblyOptions::default()).unwrap();
    assert_eq!(circuit.cluster_count(), 2);
    assert_eq!(circuit.node_count(NodeKind::Entry), 3);
    assert_eq!(circuit.label_blob(), b"adderabsum");
    assert_eq!(circuit.node_label(NodeKind::Exit, 0), Some("sum"));

    assert_eq!(
        circuit.predecessors(NodeKind::Exit, 0),
        Some(vec![(NodeKind::Entry, 0), (NodeKind::Entry, 1)])
    );
    let inner = circuit.node_index(NodeRef::entry(1, 0)).unwrap();
    assert_eq!(
        circuit.successors(NodeKind::Exit, 0),
        Some(vec![(NodeKind::Entry, inner)])
    );
    assert_eq!(circuit.parent(1), Some(0));
    assert_eq!(
        circuit.cluster_territory_at(0, 0.25),
        Some(Rectangle::new(0.0, 0.0, 5.0, 2.0))
    );
}

#[test]
fn json_round_trips_through_text() {
    let input = CircuitInput::from_json_str(CIRCUIT).unwrap();
    let text = input.to_json().unwrap();
    assert_eq!(CircuitInput::from_json_str(&text).unwrap(), input);
}

#[test]
fn unknown_fields_are_rejected() {
    let err = CircuitInput::from_json_str(r#"{ "clusters": [{ "colour": "red" }] }"#);
    assert!(err.is_err());

    let bad_kind = r#"{ "clusters": [{ "entry_nodes": [{ "edges": [{ "kind": "side", "cluster": 0, "node": 0 }] }] }] }"#;
    assert!(CircuitInput::from_json_str(bad_kind).is_err());
}

#[test]
fn options_from_toml_shape_the_output() {
    let options = AssemblyOptions::from_toml_str(
        r#"
        labels = "never"
        keyframes = "never"
        "#,
    )
    .unwrap();
    assert_eq!(options.hierarchy, Emission::Auto);

    let input = CircuitInput::from_json_str(CIRCUIT).unwrap();
    let circuit = assemble(&input, &options).unwrap();
    assert!(circuit.label_blob().is_empty());
    assert!(circuit.store().cluster_keyframes().is_empty());
    assert_eq!(circuit.cluster_territory_at(0, 0.25), None);
    assert_eq!(circuit.store().cluster_extra1().len(), 2);
}
