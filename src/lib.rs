//! Kestrel Graph Engine
//!
//! An in-memory property graph with per-element spin guards, a single-worker
//! transaction pipeline, property scans, pluggable path traversals with a compiled
//! executor cache, and whole-store binary snapshots.
//!
//! # Architecture
//!
//! - [`concurrency`]: the reader/writer spin guard every stored element is wrapped in
//! - [`graph`]: ids, property values, vertex and edge models, [`GraphStore`]
//! - [`transaction`]: batched creates applied in FIFO order by one worker, all or nothing
//! - [`scan`]: comparison operators, expressions, traversal filters and cost functions
//! - [`index`]: named property indices
//! - [`traversal`]: path specifications, plugins (BFS, BLS, Dijkstra, AllPaths), executor cache
//! - [`persistence`]: three-stream snapshot codec
//! - [`engine`]: the facade tying these together
//!
//! ## Example Usage
//!
//! ```rust
//! use kestrel::graph::{EdgeType, Label, Properties, PropertyContainer, PropertyId, VertexId};
//! use kestrel::scan::BinaryOperator;
//! use kestrel::traversal::PathSpecification;
//! use kestrel::GraphEngine;
//!
//! let engine = GraphEngine::new().unwrap();
//! let name = PropertyId(0);
//! for person in ["Alice", "Bob"] {
//!     let properties = Properties::from(vec![PropertyContainer::new(name, person)]);
//!     engine.create_vertex(0, Some(Label::new("person")), properties).unwrap();
//! }
//! engine.create_edge(VertexId(0), EdgeType(0), VertexId(1), 0).unwrap();
//!
//! let alice = engine.graph_scan(name, "Alice".into(), BinaryOperator::Equals).unwrap();
//! assert_eq!(alice.len(), 1);
//!
//! let spec = PathSpecification::new("BFS", VertexId(0)).to(VertexId(1));
//! let paths = engine.traverse(&spec).unwrap();
//! assert_eq!(paths[0].len(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod concurrency;
pub mod config;
pub mod engine;
pub mod graph;
pub mod index;
pub mod logging;
pub mod persistence;
pub mod scan;
pub mod transaction;
pub mod traversal;

// Re-export main types for convenience
pub use concurrency::{ConcurrencyGuard, ConcurrencyViolation, Guarded};

pub use config::{CacheConfig, ConfigError, EngineConfig, PersistenceConfig, ScanConfig};

pub use engine::{EngineError, EngineResult, GraphEngine};

pub use graph::{
    Direction, EdgeId, EdgeModel, EdgeType, GraphError, GraphResult, GraphStore, Label, Properties,
    PropertyContainer, PropertyId, PropertyValue, VertexId, VertexModel,
};

pub use persistence::{PersistenceCodec, PersistenceError, PersistenceResult, ServiceMetadata};

pub use scan::{BinaryOperator, GraphScanner, PropertyExpression, ScanTarget};

pub use transaction::{
    Endpoint, Transaction, TransactionError, TransactionHandle, TransactionPipeline, TransactionStatus,
};

pub use traversal::{Path, PathError, PathSpecification, PathTraversalRegistry};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
