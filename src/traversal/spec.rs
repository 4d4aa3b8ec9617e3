//! Traversal specifications

use crate::graph::{Direction, VertexId};
use crate::scan::{EdgeCost, TraversalFilters, VertexCost};
use std::fmt;

/// Everything that determines how a traversal runs.
///
/// Structurally equal specifications hash and compare equal, which is what lets them key
/// the executor cache. Custom filters and costs are equal only when they are clones of the
/// same [`NamedFn`](crate::scan::NamedFn).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSpecification {
    /// Name of the registered plugin that runs this specification
    pub algorithm: String,
    pub source: VertexId,
    /// Destinations; a path ends at whichever is reached first. Some plugins accept none.
    pub targets: Vec<VertexId>,
    pub direction: Direction,
    pub filters: TraversalFilters,
    pub edge_cost: EdgeCost,
    pub vertex_cost: VertexCost,
    /// Upper bound on hops per path
    pub max_depth: Option<usize>,
    /// Upper bound on returned paths
    pub max_results: Option<usize>,
}

impl PathSpecification {
    pub fn new(algorithm: impl Into<String>, source: VertexId) -> Self {
        Self {
            algorithm: algorithm.into(),
            source,
            targets: Vec::new(),
            direction: Direction::Outgoing,
            filters: TraversalFilters::default(),
            edge_cost: EdgeCost::Unit,
            vertex_cost: VertexCost::Zero,
            max_depth: None,
            max_results: None,
        }
    }

    pub fn to(mut self, target: VertexId) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = VertexId>) -> Self {
        self.targets.extend(targets);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_filters(mut self, filters: TraversalFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_edge_cost(mut self, cost: EdgeCost) -> Self {
        self.edge_cost = cost;
        self
    }

    pub fn with_vertex_cost(mut self, cost: VertexCost) -> Self {
        self.vertex_cost = cost;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

impl fmt::Display for PathSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} -> [", self.algorithm, self.source.0)?;
        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", target.0)?;
        }
        write!(f, "], {:?})", self.direction)
    }
}
