//! Traversal results

use crate::graph::{Direction, EdgeId, VertexId};
use kestrel_graph_algorithms::PathResult;
use serde::{Deserialize, Serialize};

/// One hop of a path.
///
/// `source` and `target` are the vertices in walking order; `direction` says whether the
/// edge was followed along (`Outgoing`) or against (`Incoming`) its own orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathElement {
    pub source: VertexId,
    pub target: VertexId,
    pub edge: EdgeId,
    pub direction: Direction,
    /// Edge cost plus the cost of entering `target`
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub origin: VertexId,
    pub elements: Vec<PathElement>,
    pub total_weight: f64,
}

impl Path {
    /// A path of zero hops
    pub fn empty(origin: VertexId) -> Self {
        Self {
            origin,
            elements: Vec::new(),
            total_weight: 0.0,
        }
    }

    pub fn destination(&self) -> VertexId {
        self.elements.last().map_or(self.origin, |element| element.target)
    }

    /// Vertices in walking order, origin included
    pub fn vertices(&self) -> Vec<VertexId> {
        let mut vertices = Vec::with_capacity(self.elements.len() + 1);
        vertices.push(self.origin);
        vertices.extend(self.elements.iter().map(|element| element.target));
        vertices
    }

    pub fn edges(&self) -> Vec<EdgeId> {
        self.elements.iter().map(|element| element.edge).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Edge handle the kernels carry for the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hop {
    pub edge: EdgeId,
    pub direction: Direction,
    pub weight: f64,
}

impl From<PathResult<Hop>> for Path {
    fn from(result: PathResult<Hop>) -> Self {
        let elements: Vec<PathElement> = result
            .nodes
            .windows(2)
            .zip(&result.edges)
            .map(|(pair, hop)| PathElement {
                source: VertexId(pair[0]),
                target: VertexId(pair[1]),
                edge: hop.edge,
                direction: hop.direction,
                weight: hop.weight,
            })
            .collect();
        let total_weight = elements.iter().map(|element| element.weight).sum();
        Path {
            origin: VertexId(result.source),
            elements,
            total_weight,
        }
    }
}
