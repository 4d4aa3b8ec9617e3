//! Path traversal
//!
//! Named plugins compile a [`PathSpecification`] into an executor; the registry caches
//! executors per specification so repeated queries skip compilation.

pub mod cache;
mod neighborhood;
pub mod path;
pub mod plugins;
pub mod registry;
pub mod spec;

pub use cache::{CacheStats, ExecutorCache};
pub use path::{Hop, Path, PathElement};
pub use plugins::{
    builtin_plugins, AllPaths, Bfs, Bls, BuiltinPlugin, Capability, Dijkstra, Kernel, PathExecutor,
    PathTraversal, DEFAULT_ALL_PATHS_DEPTH,
};
pub use registry::PathTraversalRegistry;
pub use spec::PathSpecification;

use crate::graph::GraphError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("Unknown traversal algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("Traversal plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("Invalid path specification: {0}")]
    InvalidSpecification(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type PathResult<T> = Result<T, PathError>;
