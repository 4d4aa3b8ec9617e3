//! Integration tests for the graph store
//!
//! Id allocation and reuse, adjacency upkeep, removal cascades and concurrent creation.

use kestrel::graph::{
    Direction, EdgeId, EdgeType, ElementId, GraphError, GraphStore, Label, Properties, PropertyContainer,
    PropertyId, PropertyValue, VertexId,
};
use std::sync::Arc;
use std::thread;

fn vertices(store: &GraphStore, count: usize) {
    for _ in 0..count {
        store.create_vertex(0, None, Properties::new()).unwrap();
    }
}

#[test]
fn test_ids_are_dense_and_reused() {
    let store = GraphStore::new();
    vertices(&store, 4);
    store.remove_vertex(VertexId(1)).unwrap();
    store.remove_vertex(VertexId(2)).unwrap();
    assert_eq!(store.free_vertex_ids(), vec![VertexId(1), VertexId(2)]);

    // Most recently released first
    let reused = store.create_vertex(5, None, Properties::new()).unwrap();
    assert_eq!(reused.read().unwrap().id, VertexId(2));
    let reused = store.create_vertex(5, None, Properties::new()).unwrap();
    assert_eq!(reused.read().unwrap().id, VertexId(1));
    let fresh = store.create_vertex(5, None, Properties::new()).unwrap();
    assert_eq!(fresh.read().unwrap().id, VertexId(4));
    assert_eq!(store.vertex_count(), 5);
}

#[test]
fn test_edges_link_both_endpoints() {
    let store = GraphStore::new();
    vertices(&store, 3);
    let edge = store
        .create_edge_with(
            VertexId(0),
            EdgeType(7),
            VertexId(2),
            3,
            Some(Label::new("knows")),
            Properties::from(vec![PropertyContainer::new(PropertyId(0), 0.5)]),
        )
        .unwrap();
    let edge_id = edge.read().unwrap().id;

    assert_eq!(store.outgoing_edges(VertexId(0), Some(EdgeType(7))).unwrap(), vec![edge_id]);
    assert_eq!(store.incoming_edges(VertexId(2), None).unwrap(), vec![edge_id]);
    assert!(store.outgoing_edges(VertexId(0), Some(EdgeType(8))).unwrap().is_empty());
    assert_eq!(store.neighbours(VertexId(2), Direction::Both).unwrap(), vec![VertexId(0)]);
    assert_eq!(edge.read().unwrap().label.as_ref().map(|l| l.as_str()), Some("knows"));
}

#[test]
fn test_invalid_endpoints_leave_store_untouched() {
    let store = GraphStore::new();
    vertices(&store, 1);
    assert_eq!(
        store.create_edge(VertexId(0), EdgeType(0), VertexId(9), 0).unwrap_err(),
        GraphError::InvalidEdgeTarget(VertexId(9))
    );
    assert_eq!(
        store.create_edge(VertexId(9), EdgeType(0), VertexId(0), 0).unwrap_err(),
        GraphError::InvalidEdgeSource(VertexId(9))
    );
    assert_eq!(store.edge_count(), 0);
    assert!(store.free_edge_ids().is_empty());

    // The id given back by the failed attempt is handed out next
    let edge = store.create_edge(VertexId(0), EdgeType(0), VertexId(0), 0).unwrap();
    assert_eq!(edge.read().unwrap().id, EdgeId(0));
}

#[test]
fn test_self_loop() {
    let store = GraphStore::new();
    vertices(&store, 1);
    store.create_edge(VertexId(0), EdgeType(1), VertexId(0), 0).unwrap();
    let vertex = store.get_vertex(VertexId(0)).unwrap();
    assert_eq!(vertex.read().unwrap().degree(), 2);

    store.remove_vertex(VertexId(0)).unwrap();
    assert_eq!(store.edge_count(), 0);
    assert_eq!(store.vertex_count(), 0);
}

#[test]
fn test_remove_vertex_cascades() {
    let store = GraphStore::new();
    vertices(&store, 3);
    store.create_edge(VertexId(0), EdgeType(0), VertexId(1), 0).unwrap();
    store.create_edge(VertexId(1), EdgeType(0), VertexId(2), 0).unwrap();
    store.create_edge(VertexId(2), EdgeType(0), VertexId(0), 0).unwrap();

    let removed = store.remove_vertex(VertexId(1)).unwrap();
    assert_eq!(removed.id, VertexId(1));
    assert_eq!(store.edge_count(), 1);
    assert!(store.outgoing_edges(VertexId(0), None).unwrap().is_empty());
    assert!(store.incoming_edges(VertexId(2), None).unwrap().is_empty());
    assert_eq!(store.remove_vertex(VertexId(1)).unwrap_err(), GraphError::VertexNotFound(VertexId(1)));
    assert!(store.exclusive().image().unwrap().validate().is_ok());
}

#[test]
fn test_properties_in_place() {
    let store = GraphStore::new();
    vertices(&store, 2);
    store.create_edge(VertexId(0), EdgeType(0), VertexId(1), 0).unwrap();
    let name = PropertyId(3);

    assert_eq!(
        store.set_property(VertexId(0).into(), name, "first".into()).unwrap(),
        None
    );
    assert_eq!(
        store.set_property(VertexId(0).into(), name, "second".into()).unwrap(),
        Some(PropertyValue::from("first"))
    );
    store.set_property(EdgeId(0).into(), name, 2.5.into()).unwrap();
    assert_eq!(
        store.remove_property(ElementId::Edge(EdgeId(0)), name).unwrap(),
        Some(PropertyValue::from(2.5))
    );
    assert_eq!(
        store.set_property(VertexId(9).into(), name, 1i64.into()).unwrap_err(),
        GraphError::VertexNotFound(VertexId(9))
    );

    let duplicate = Properties::from(vec![
        PropertyContainer::new(name, 1i64),
        PropertyContainer::new(name, 2i64),
    ]);
    assert!(store.create_vertex(0, None, duplicate).unwrap_err().is_validation());
}

#[test]
fn test_trim_and_clear() {
    let store = GraphStore::new();
    vertices(&store, 5);
    store.remove_vertex(VertexId(4)).unwrap();
    store.remove_vertex(VertexId(3)).unwrap();
    store.remove_vertex(VertexId(1)).unwrap();

    assert_eq!(store.trim(), (2, 0));
    assert_eq!(store.free_vertex_ids(), vec![VertexId(1)]);
    let next = store.create_vertex(0, None, Properties::new()).unwrap();
    assert_eq!(next.read().unwrap().id, VertexId(1));
    let next = store.create_vertex(0, None, Properties::new()).unwrap();
    assert_eq!(next.read().unwrap().id, VertexId(3));

    store.clear();
    assert_eq!(store.vertex_count(), 0);
    let first = store.create_vertex(0, None, Properties::new()).unwrap();
    assert_eq!(first.read().unwrap().id, VertexId(0));
}

#[test]
fn test_opposing_edges_do_not_deadlock() {
    let store = Arc::new(GraphStore::new());
    vertices(&store, 8);

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..250u32 {
                    let a = VertexId((worker + round) % 8);
                    let b = VertexId((worker * 3 + round * 5 + 1) % 8);
                    // Half the workers link a->b, the other half b->a
                    let (source, target) = if worker % 2 == 0 { (a, b) } else { (b, a) };
                    store.create_edge(source, EdgeType(0), target, 0).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.edge_count(), 1_000);
    let linked: usize = (0..8)
        .map(|v| store.outgoing_edges(VertexId(v), None).unwrap().len())
        .sum();
    assert_eq!(linked, 1_000);
    assert!(store.exclusive().image().unwrap().validate().is_ok());
}
