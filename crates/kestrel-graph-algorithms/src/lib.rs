//! Traversal kernels for the Kestrel graph engine.
//!
//! The kernels are generic over [`Neighborhood`]; callers supply the topology
//! and the filtering, the kernels supply the search order.

pub mod common;
pub mod pathfinding;

pub use common::{GraphView, Neighborhood, NodeId, PathResult, Step};
pub use pathfinding::{all_paths, bfs, bidirectional_bfs, dijkstra};
