//! Snapshot persistence
//!
//! A snapshot is three files next to a base path, one per stream (graph elements,
//! indices, service metadata). Saving and loading both hold the store exclusively.

pub mod codec;
pub mod snapshot;

pub use codec::{read_stream, stream_path, versions_on_disk, write_stream, StreamKind, FORMAT_VERSION};
pub use snapshot::{PersistenceCodec, ServiceMetadata, SnapshotPaths};

use crate::graph::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("{stream} stream has marker {found:?}")]
    MarkerMismatch { stream: StreamKind, found: [u8; 4] },

    #[error("{stream} stream has format version {found}, expected {expected}")]
    VersionMismatch {
        stream: StreamKind,
        expected: u16,
        found: u16,
    },

    #[error("{0} stream is truncated")]
    Truncated(StreamKind),

    #[error("{0} stream failed its checksum")]
    ChecksumMismatch(StreamKind),

    #[error("Snapshot is inconsistent: {0}")]
    Inconsistent(String),

    #[error("Snapshot path {0:?} has no file name")]
    InvalidPath(PathBuf),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl PersistenceError {
    /// The persisted bytes are unusable, as opposed to the file system failing
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            PersistenceError::Serialization(_)
                | PersistenceError::MarkerMismatch { .. }
                | PersistenceError::VersionMismatch { .. }
                | PersistenceError::Truncated(_)
                | PersistenceError::ChecksumMismatch(_)
                | PersistenceError::Inconsistent(_)
        )
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
