//! Batched structural mutation
//!
//! A [`Transaction`] collects create operations; [`TransactionPipeline`] applies them on a
//! single worker in submission order and reports through a [`TransactionHandle`].

pub mod batch;
pub mod handle;
pub mod pipeline;

pub use batch::{EdgeSpec, Endpoint, Operation, Transaction, VertexSpec};
pub use handle::{CreatedEntities, TransactionHandle, TransactionId, TransactionStatus};
pub use pipeline::{PipelineStats, TransactionPipeline};

use crate::graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("Transaction failed and was rolled back: {0}")]
    Failed(GraphError),

    #[error("Transaction pipeline is closed")]
    PipelineClosed,

    #[error("Transaction {0} has not finished")]
    NotFinished(TransactionId),

    #[error("Transaction worker could not start: {0}")]
    Worker(String),
}

pub type TransactionResult<T> = Result<T, TransactionError>;
