//! Core graph storage
//!
//! This module implements the property graph data model with:
//! - Dense, reusable u32 ids for vertices and edges
//! - Ordered property sequences keyed by small integer ids
//! - Adjacency grouped by edge type on both sides of a vertex
//! - Per-element guards around every stored model

pub mod arena;
pub mod edge;
pub mod element;
pub mod property;
pub mod store;
pub mod types;
pub mod vertex;

// Re-export main types
pub use arena::{ArenaImage, IdAllocator};
pub use edge::EdgeModel;
pub use element::GraphElement;
pub use property::{Properties, PropertyContainer, PropertyValue};
pub use store::{EdgeRef, ExclusiveStore, GraphError, GraphImage, GraphResult, GraphStore, VertexRef};
pub use types::{
    now_timestamp, Direction, EdgeId, EdgeType, ElementId, Label, PropertyId, Timestamp, VertexId,
};
pub use vertex::{Adjacency, VertexModel};
