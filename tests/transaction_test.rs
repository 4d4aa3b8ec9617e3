//! Integration tests for the transaction pipeline
//!
//! FIFO application, all-or-nothing rollback and handle behaviour.

use kestrel::graph::{EdgeType, GraphError, GraphStore, Label, Properties, VertexId};
use kestrel::transaction::{
    Endpoint, Transaction, TransactionError, TransactionPipeline, TransactionStatus,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn pipeline() -> (Arc<GraphStore>, TransactionPipeline) {
    let store = Arc::new(GraphStore::new());
    let pipeline = TransactionPipeline::start(Arc::clone(&store)).unwrap();
    (store, pipeline)
}

#[test]
fn test_pending_endpoints_resolve_inside_batch() {
    let (store, pipeline) = pipeline();
    let mut tx = Transaction::new();
    let a = tx.add_vertex(1, Some(Label::new("a")), Properties::new());
    let b = tx.add_vertex(1, Some(Label::new("b")), Properties::new());
    tx.add_edge(a, EdgeType(0), b, 1).add_edge(b, EdgeType(0), a, 1);
    assert_eq!((tx.vertex_count(), tx.edge_count()), (2, 2));

    let handle = pipeline.enqueue(tx).unwrap();
    handle.wait_until_finished().unwrap();
    assert_eq!(handle.status(), TransactionStatus::Committed);

    let edges = handle.created_edges().unwrap();
    let first = edges[0].read().unwrap();
    assert_eq!((first.source, first.target), (VertexId(0), VertexId(1)));
    assert_eq!(store.edge_count(), 2);
}

#[test]
fn test_failure_rolls_back_whole_batch() {
    let (store, pipeline) = pipeline();
    store.create_vertex(0, None, Properties::new()).unwrap();

    let mut tx = Transaction::new();
    let fresh = tx.add_vertex(1, None, Properties::new());
    tx.add_edge(VertexId(0), EdgeType(0), fresh, 1);
    tx.add_edge(fresh, EdgeType(0), VertexId(42), 1);
    let handle = pipeline.enqueue(tx).unwrap();

    let err = handle.wait_until_finished().unwrap_err();
    assert_eq!(err, TransactionError::Failed(GraphError::InvalidEdgeTarget(VertexId(42))));
    assert_eq!(handle.status(), TransactionStatus::Failed);
    assert!(handle.created_vertices().is_err());

    assert_eq!(store.vertex_count(), 1);
    assert_eq!(store.edge_count(), 0);
    assert!(store.outgoing_edges(VertexId(0), None).unwrap().is_empty());
    assert_eq!(pipeline.stats().rolled_back(), 1);

    // Ids of the rolled back batch are handed out again
    let mut retry = Transaction::new();
    retry.add_vertex(2, None, Properties::new());
    let handle = pipeline.enqueue(retry).unwrap();
    handle.wait_until_finished().unwrap();
    assert_eq!(handle.created_vertices().unwrap()[0].read().unwrap().id, VertexId(1));
}

#[test]
fn test_pending_endpoint_must_precede_edge() {
    let (store, pipeline) = pipeline();
    let mut tx = Transaction::new();
    tx.add_edge(Endpoint::Pending(0), EdgeType(0), Endpoint::Pending(0), 1);
    tx.add_vertex(1, None, Properties::new());
    let handle = pipeline.enqueue(tx).unwrap();
    assert!(matches!(
        handle.wait_until_finished(),
        Err(TransactionError::Failed(ref err)) if err.is_validation()
    ));
    assert_eq!(store.vertex_count(), 0);
}

#[test]
fn test_transactions_apply_in_submission_order() {
    let (store, pipeline) = pipeline();
    let handles: Vec<_> = (0..20)
        .map(|i| {
            let mut tx = Transaction::new();
            tx.add_vertex(i, None, Properties::new());
            pipeline.enqueue(tx).unwrap()
        })
        .collect();

    for (position, handle) in handles.iter().enumerate() {
        handle.wait_until_finished().unwrap();
        let vertex = &handle.created_vertices().unwrap()[0];
        let vertex = vertex.read().unwrap();
        assert_eq!(vertex.id, VertexId(position as u32));
        assert_eq!(vertex.creation_timestamp, position as u32);
    }
    let ids: Vec<_> = handles.iter().map(|h| h.id()).collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(store.vertex_count(), 20);
    assert_eq!(pipeline.stats().committed(), 20);
}

#[test]
fn test_handles_from_many_threads() {
    let (store, pipeline) = pipeline();
    let pipeline = Arc::new(pipeline);
    let submitters: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                for _ in 0..25 {
                    let mut tx = Transaction::new();
                    let a = tx.add_vertex(0, None, Properties::new());
                    let b = tx.add_vertex(0, None, Properties::new());
                    tx.add_edge(a, EdgeType(1), b, 0);
                    let handle = pipeline.enqueue(tx).unwrap();
                    assert!(handle.wait_timeout(Duration::from_secs(10)).unwrap().is_ok());
                }
            })
        })
        .collect();
    for submitter in submitters {
        submitter.join().unwrap();
    }
    assert_eq!(store.vertex_count(), 200);
    assert_eq!(store.edge_count(), 100);
}

#[test]
fn test_shutdown_drains_and_closes() {
    let (store, pipeline) = pipeline();
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let mut tx = Transaction::new();
            tx.add_vertex(0, None, Properties::new());
            pipeline.enqueue(tx).unwrap()
        })
        .collect();

    pipeline.shutdown();
    assert!(!pipeline.is_running());
    assert!(handles.iter().all(|handle| handle.status() == TransactionStatus::Committed));
    assert_eq!(store.vertex_count(), 10);
    assert_eq!(
        pipeline.enqueue(Transaction::new()).unwrap_err(),
        TransactionError::PipelineClosed
    );
}
