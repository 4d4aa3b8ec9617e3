//! Completion handles for enqueued transactions

use super::TransactionError;
use crate::graph::{EdgeRef, VertexRef};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic id assigned at enqueue time
pub type TransactionId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Committed,
    Failed,
}

/// Entities a committed transaction created, in submission order
#[derive(Debug, Clone, Default)]
pub struct CreatedEntities {
    pub vertices: Vec<VertexRef>,
    pub edges: Vec<EdgeRef>,
}

#[derive(Debug)]
enum Outcome {
    Pending,
    Committed(CreatedEntities),
    Failed(TransactionError),
}

/// Completion signal shared between the worker and every handle clone
#[derive(Debug)]
pub(crate) struct Completion {
    outcome: Mutex<Outcome>,
    finished: Condvar,
}

impl Completion {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Outcome::Pending),
            finished: Condvar::new(),
        })
    }

    pub(crate) fn finish(&self, result: Result<CreatedEntities, TransactionError>) {
        let mut outcome = self.outcome.lock();
        *outcome = match result {
            Ok(created) => Outcome::Committed(created),
            Err(err) => Outcome::Failed(err),
        };
        self.finished.notify_all();
    }

    /// Fail the transaction unless it already finished
    pub(crate) fn abandon(&self) {
        let mut outcome = self.outcome.lock();
        if matches!(*outcome, Outcome::Pending) {
            *outcome = Outcome::Failed(TransactionError::PipelineClosed);
            self.finished.notify_all();
        }
    }
}

/// Caller's view of one enqueued transaction
#[derive(Debug, Clone)]
pub struct TransactionHandle {
    id: TransactionId,
    completion: Arc<Completion>,
}

impl TransactionHandle {
    pub(crate) fn new(id: TransactionId, completion: Arc<Completion>) -> Self {
        Self { id, completion }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Current status, without waiting
    pub fn status(&self) -> TransactionStatus {
        match *self.completion.outcome.lock() {
            Outcome::Pending => TransactionStatus::Pending,
            Outcome::Committed(_) => TransactionStatus::Committed,
            Outcome::Failed(_) => TransactionStatus::Failed,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status() != TransactionStatus::Pending
    }

    /// Block until the worker committed or rolled back the transaction
    pub fn wait_until_finished(&self) -> Result<(), TransactionError> {
        let mut outcome = self.completion.outcome.lock();
        while matches!(*outcome, Outcome::Pending) {
            self.completion.finished.wait(&mut outcome);
        }
        settle(self.id, &outcome).map(|_| ())
    }

    /// Like [`wait_until_finished`](Self::wait_until_finished), giving up after `timeout`.
    ///
    /// Returns `None` if the transaction is still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<(), TransactionError>> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.completion.outcome.lock();
        while matches!(*outcome, Outcome::Pending) {
            if self
                .completion
                .finished
                .wait_until(&mut outcome, deadline)
                .timed_out()
            {
                break;
            }
        }
        match *outcome {
            Outcome::Pending => None,
            _ => Some(settle(self.id, &outcome).map(|_| ())),
        }
    }

    /// Vertices created by the committed transaction, in submission order
    pub fn created_vertices(&self) -> Result<Vec<VertexRef>, TransactionError> {
        self.created(|created| created.vertices.clone())
    }

    /// Edges created by the committed transaction, in submission order
    pub fn created_edges(&self) -> Result<Vec<EdgeRef>, TransactionError> {
        self.created(|created| created.edges.clone())
    }

    fn created<T>(&self, pick: impl FnOnce(&CreatedEntities) -> T) -> Result<T, TransactionError> {
        let outcome = self.completion.outcome.lock();
        settle(self.id, &outcome).map(pick)
    }
}

fn settle(id: TransactionId, outcome: &Outcome) -> Result<&CreatedEntities, TransactionError> {
    match outcome {
        Outcome::Committed(created) => Ok(created),
        Outcome::Failed(err) => Err(err.clone()),
        Outcome::Pending => Err(TransactionError::NotFinished(id)),
    }
}
