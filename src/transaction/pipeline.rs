//! Single-worker transaction pipeline
//!
//! Transactions go into an unbounded FIFO and one dedicated thread applies them in
//! submission order. A failing operation rolls back everything its transaction created
//! before the handle reports the failure.
//!
//! The queue is tokio's unbounded mpsc channel, but no async runtime is involved: the worker
//! is a plain OS thread parked in `blocking_recv`. The sender side is `Send + Sync` and never
//! blocks, so submitters from async contexts can enqueue without spawning a blocking task.

use super::batch::{Endpoint, Operation, Transaction};
use super::handle::{Completion, CreatedEntities, TransactionHandle, TransactionId};
use super::{TransactionError, TransactionResult};
use crate::graph::{ElementId, GraphError, GraphResult, GraphStore, VertexId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

struct Job {
    id: TransactionId,
    transaction: Transaction,
    completion: Arc<Completion>,
}

impl Drop for Job {
    fn drop(&mut self) {
        // No-op once the worker finished it
        self.completion.abandon();
    }
}

/// Counters kept by the worker
#[derive(Debug, Default)]
pub struct PipelineStats {
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl PipelineStats {
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn rolled_back(&self) -> u64 {
        self.rolled_back.load(Ordering::Relaxed)
    }
}

/// Serializes batched structural mutations onto one worker thread
pub struct TransactionPipeline {
    sender: Mutex<Option<(TransactionId, UnboundedSender<Job>)>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<PipelineStats>,
}

impl TransactionPipeline {
    /// Start the worker thread
    pub fn start(store: Arc<GraphStore>) -> TransactionResult<Self> {
        let (sender, receiver) = unbounded_channel();
        let stats = Arc::new(PipelineStats::default());
        let worker_stats = Arc::clone(&stats);
        let worker = thread::Builder::new()
            .name("kestrel-tx-worker".to_string())
            .spawn(move || run_worker(store, receiver, worker_stats))
            .map_err(|err| TransactionError::Worker(err.to_string()))?;
        info!("transaction pipeline started");

        Ok(Self {
            sender: Mutex::new(Some((1, sender))),
            worker: Mutex::new(Some(worker)),
            stats,
        })
    }

    /// Append a transaction to the queue.
    ///
    /// Ids are assigned under the same lock as the send, so id order is queue order.
    pub fn enqueue(&self, transaction: Transaction) -> TransactionResult<TransactionHandle> {
        let mut sender = self.sender.lock();
        let (next_id, channel) = sender.as_mut().ok_or(TransactionError::PipelineClosed)?;
        let id = *next_id;
        let completion = Completion::new();
        let job = Job {
            id,
            transaction,
            completion: Arc::clone(&completion),
        };
        channel.send(job).map_err(|_| TransactionError::PipelineClosed)?;
        *next_id += 1;
        debug!(transaction = id, "transaction enqueued");
        Ok(TransactionHandle::new(id, completion))
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Stop accepting transactions, let the worker drain the queue, then join it
    pub fn shutdown(&self) {
        let sender = self.sender.lock().take();
        if sender.is_none() {
            return;
        }
        drop(sender);
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!("transaction worker panicked");
            }
        }
        info!(
            committed = self.stats.committed(),
            rolled_back = self.stats.rolled_back(),
            "transaction pipeline stopped"
        );
    }
}

impl Drop for TransactionPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(store: Arc<GraphStore>, mut receiver: UnboundedReceiver<Job>, stats: Arc<PipelineStats>) {
    while let Some(job) = receiver.blocking_recv() {
        let operations = job.transaction.len();
        match apply(&store, &job.transaction) {
            Ok(created) => {
                stats.committed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    transaction = job.id,
                    vertices = created.vertices.len(),
                    edges = created.edges.len(),
                    "transaction committed"
                );
                job.completion.finish(Ok(created));
            }
            Err(err) => {
                stats.rolled_back.fetch_add(1, Ordering::Relaxed);
                warn!(transaction = job.id, operations, error = %err, "transaction rolled back");
                job.completion.finish(Err(TransactionError::Failed(err)));
            }
        }
    }
}

/// Apply every operation or none of them
fn apply(store: &GraphStore, transaction: &Transaction) -> GraphResult<CreatedEntities> {
    transaction.check_endpoints()?;
    let _gate = store.read_gate();

    let mut created = CreatedEntities::default();
    let mut vertex_ids: Vec<VertexId> = Vec::with_capacity(transaction.vertex_count());
    for operation in transaction.operations() {
        if let Err(err) = apply_one(store, operation, &mut vertex_ids, &mut created) {
            roll_back(store, &created);
            return Err(err);
        }
    }
    Ok(created)
}

fn apply_one(
    store: &GraphStore,
    operation: &Operation,
    vertex_ids: &mut Vec<VertexId>,
    created: &mut CreatedEntities,
) -> GraphResult<()> {
    match operation {
        Operation::CreateVertex(spec) => {
            let vertex = store.create_vertex(
                spec.creation_timestamp,
                spec.label.clone(),
                spec.properties.clone(),
            )?;
            created.vertices.push(vertex);
            if let Some(vertex) = created.vertices.last() {
                let id = vertex.read()?.id;
                vertex_ids.push(id);
            }
        }
        Operation::CreateEdge(spec) => {
            let source = resolve(spec.source, vertex_ids)?;
            let target = resolve(spec.target, vertex_ids)?;
            let edge = store.create_edge_with(
                source,
                spec.edge_type,
                target,
                spec.creation_timestamp,
                spec.label.clone(),
                spec.properties.clone(),
            )?;
            created.edges.push(edge);
        }
    }
    Ok(())
}

fn resolve(endpoint: Endpoint, vertex_ids: &[VertexId]) -> GraphResult<VertexId> {
    match endpoint {
        Endpoint::Existing(id) => Ok(id),
        Endpoint::Pending(index) => vertex_ids.get(index).copied().ok_or_else(|| {
            GraphError::Validation(format!("pending vertex {} was not created", index))
        }),
    }
}

/// Remove what a failed transaction created, newest first, so the ids go back to the
/// free list in the order they were handed out.
fn roll_back(store: &GraphStore, created: &CreatedEntities) {
    let mut doomed = Vec::with_capacity(created.edges.len() + created.vertices.len());
    for edge in created.edges.iter().rev() {
        if let Ok(edge) = edge.read() {
            doomed.push(ElementId::Edge(edge.id));
        }
    }
    for vertex in created.vertices.iter().rev() {
        if let Ok(vertex) = vertex.read() {
            doomed.push(ElementId::Vertex(vertex.id));
        }
    }

    for element in doomed {
        let result = match element {
            ElementId::Edge(id) => store.remove_edge(id).map(|_| ()),
            ElementId::Vertex(id) => store.remove_vertex(id).map(|_| ()),
        };
        if let Err(err) = result {
            warn!(%element, error = %err, "rollback could not remove element");
        }
    }
}
