//! End-to-end scenario: five people and who communicates with, trusts and attacks whom

use kestrel::graph::{
    Direction, EdgeType, Label, Properties, PropertyContainer, PropertyId, PropertyValue, VertexId,
};
use kestrel::scan::{BinaryOperator, EdgeFilter, ScanTarget, TraversalFilters};
use kestrel::traversal::PathSpecification;
use kestrel::{GraphEngine, Transaction};
use tempfile::TempDir;

const NAME: PropertyId = PropertyId(0);
const COMMUNICATES_WITH: EdgeType = EdgeType(0);
const TRUSTS: EdgeType = EdgeType(1);
const ATTACKS: EdgeType = EdgeType(2);

const ALICE: VertexId = VertexId(0);
const BOB: VertexId = VertexId(1);
const EVE: VertexId = VertexId(2);
const MALLORY: VertexId = VertexId(3);
const TRENT: VertexId = VertexId(4);

fn person(name: &str) -> Properties {
    Properties::from(vec![PropertyContainer::new(NAME, name)])
}

fn build_directly() -> GraphEngine {
    let engine = GraphEngine::new().unwrap();
    for name in ["Alice", "Bob", "Eve", "Mallory", "Trent"] {
        engine
            .create_vertex(1, Some(Label::new("person")), person(name))
            .unwrap();
    }
    for (source, edge_type, target) in [
        (ALICE, COMMUNICATES_WITH, BOB),
        (ALICE, TRUSTS, TRENT),
        (BOB, TRUSTS, TRENT),
        (EVE, ATTACKS, ALICE),
        (MALLORY, ATTACKS, ALICE),
        (MALLORY, ATTACKS, BOB),
    ] {
        engine.create_edge(source, edge_type, target, 2).unwrap();
    }
    engine
}

fn build_batched() -> GraphEngine {
    let engine = GraphEngine::new().unwrap();
    let mut tx = Transaction::new();
    let people: Vec<_> = ["Alice", "Bob", "Eve", "Mallory", "Trent"]
        .iter()
        .map(|name| tx.add_vertex(1, Some(Label::new("person")), person(name)))
        .collect();
    tx.add_edge(people[0], COMMUNICATES_WITH, people[1], 2)
        .add_edge(people[0], TRUSTS, people[4], 2)
        .add_edge(people[1], TRUSTS, people[4], 2)
        .add_edge(people[2], ATTACKS, people[0], 2)
        .add_edge(people[3], ATTACKS, people[0], 2)
        .add_edge(people[3], ATTACKS, people[1], 2);
    let handle = engine.enqueue(tx).unwrap();
    handle.wait_until_finished().unwrap();
    assert_eq!(handle.created_vertices().unwrap().len(), 5);
    assert_eq!(handle.created_edges().unwrap().len(), 6);
    engine
}

fn check_scenario(engine: &GraphEngine) {
    assert_eq!(engine.store().vertex_count(), 5);
    assert_eq!(engine.store().edge_count(), 6);

    let found = engine
        .graph_scan(NAME, PropertyValue::from("Alice"), BinaryOperator::Equals)
        .unwrap();
    assert_eq!(found.len(), 1);
    let alice = found[0].as_vertex().expect("a vertex");
    let alice = alice.read().unwrap();
    assert_eq!(alice.id, ALICE);
    assert_eq!(alice.properties.get(NAME), Some(&PropertyValue::from("Alice")));
}

#[test]
fn test_scenario_direct_creation() {
    check_scenario(&build_directly());
}

#[test]
fn test_scenario_batched_creation() {
    check_scenario(&build_batched());
}

#[test]
fn test_scenario_adjacency() {
    let engine = build_directly();
    let store = engine.store();
    assert_eq!(store.outgoing_edges(MALLORY, Some(ATTACKS)).unwrap().len(), 2);
    assert_eq!(store.incoming_edges(TRENT, Some(TRUSTS)).unwrap().len(), 2);
    assert_eq!(store.incoming_edges(ALICE, None).unwrap().len(), 2);
    assert_eq!(
        store.incident_edge_types(ALICE).unwrap(),
        vec![COMMUNICATES_WITH, TRUSTS, ATTACKS]
    );
    let mut attackers = store.neighbours(ALICE, Direction::Incoming).unwrap();
    attackers.sort();
    assert_eq!(attackers, vec![EVE, MALLORY]);
}

#[test]
fn test_scenario_scans() {
    let engine = build_directly();
    let scanner = engine.scanner();

    let not_alice = scanner
        .graph_scan(NAME, "Alice".into(), BinaryOperator::NotEquals, ScanTarget::Vertices)
        .unwrap();
    assert_eq!(not_alice.len(), 4);

    let before_f = scanner
        .graph_scan(NAME, "F".into(), BinaryOperator::Lower, ScanTarget::Vertices)
        .unwrap();
    let mut ids: Vec<_> = before_f.iter().map(|e| e.as_vertex().unwrap().read().unwrap().id).collect();
    ids.sort();
    assert_eq!(ids, vec![ALICE, BOB, EVE]);

    let people = scanner.label_scan(&Label::new("person"), ScanTarget::All).unwrap();
    assert_eq!(people.len(), 5);
}

#[test]
fn test_scenario_traversals() {
    let engine = build_directly();

    let spec = PathSpecification::new("BFS", EVE).to(TRENT);
    let paths = engine.traverse(&spec).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].vertices(), vec![EVE, ALICE, TRENT]);

    let mut all: Vec<Vec<VertexId>> = engine
        .traverse(&PathSpecification::new("AllPaths", MALLORY).to(TRENT))
        .unwrap()
        .iter()
        .map(|path| path.vertices())
        .collect();
    all.sort();
    assert_eq!(
        all,
        vec![
            vec![MALLORY, ALICE, BOB, TRENT],
            vec![MALLORY, ALICE, TRENT],
            vec![MALLORY, BOB, TRENT],
        ]
    );

    // Walking back from Trent along trust edges only reaches the trusting people
    let trust_only = TraversalFilters::new().with_edge(EdgeFilter::types([TRUSTS]));
    let back = PathSpecification::new("BLS", TRENT)
        .to(MALLORY)
        .with_direction(Direction::Incoming)
        .with_filters(trust_only.clone());
    assert!(engine.traverse(&back).unwrap().is_empty());

    let back = PathSpecification::new("BLS", TRENT)
        .to(BOB)
        .with_direction(Direction::Incoming)
        .with_filters(trust_only);
    let paths = engine.traverse(&back).unwrap();
    assert_eq!(paths[0].vertices(), vec![TRENT, BOB]);
    assert_eq!(paths[0].elements[0].direction, Direction::Incoming);
}

#[test]
fn test_scenario_survives_snapshot() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("scenario");
    let engine = build_batched();
    engine.save(&base).unwrap();

    let restored = GraphEngine::new().unwrap();
    restored.load(&base).unwrap();
    check_scenario(&restored);
    assert_eq!(
        restored.store().exclusive().image().unwrap(),
        engine.store().exclusive().image().unwrap()
    );
}
