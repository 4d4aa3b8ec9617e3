//! The live store as seen by the traversal kernels
//!
//! Expanding a vertex copies its adjacency under its read guard and releases it before
//! any edge or neighbour is read, so a traversal never holds two guards at once.

use super::path::Hop;
use super::spec::PathSpecification;
use crate::graph::{
    Direction, EdgeId, EdgeType, GraphError, GraphResult, GraphStore, VertexId, VertexModel,
};
use crate::scan::{EdgeCost, TraversalFilters, VertexCost};
use kestrel_graph_algorithms::{Neighborhood, NodeId, Step};
use rustc_hash::FxHashSet;
use std::cell::RefCell;

/// Filters and costs of one specification, prepared once per compiled executor
#[derive(Debug, Clone)]
pub(crate) struct TraversalPlan {
    direction: Direction,
    /// Edge-type whitelist checked before the edge itself is read
    edge_types: Option<FxHashSet<EdgeType>>,
    filters: TraversalFilters,
    edge_cost: EdgeCost,
    vertex_cost: VertexCost,
    /// Neighbours only need a read when a vertex filter or vertex cost looks at them
    reads_vertices: bool,
}

impl TraversalPlan {
    pub(crate) fn compile(spec: &PathSpecification) -> Self {
        let edge_types = spec
            .filters
            .edge
            .as_ref()
            .and_then(|filter| filter.edge_types())
            .map(|types| types.iter().copied().collect());
        let reads_vertices = spec.filters.vertex.is_some()
            || spec.filters.label.is_some()
            || !spec.vertex_cost.is_zero();
        Self {
            direction: spec.direction,
            edge_types,
            filters: spec.filters.clone(),
            edge_cost: spec.edge_cost.clone(),
            vertex_cost: spec.vertex_cost.clone(),
            reads_vertices,
        }
    }

    fn allows_type(&self, edge_type: EdgeType) -> bool {
        self.edge_types.as_ref().map_or(true, |types| types.contains(&edge_type))
    }

    pub(crate) fn accepts_vertex(&self, vertex: &VertexModel) -> bool {
        self.filters.accepts_vertex(vertex)
    }

    fn vertex_cost(&self, vertex: &VertexModel) -> f64 {
        self.vertex_cost.cost(vertex)
    }
}

pub(crate) struct StoreNeighborhood<'a> {
    store: &'a GraphStore,
    plan: &'a TraversalPlan,
    /// Exempt from the vertex filters
    source: VertexId,
    error: RefCell<Option<GraphError>>,
}

impl<'a> StoreNeighborhood<'a> {
    pub(crate) fn new(store: &'a GraphStore, plan: &'a TraversalPlan, source: VertexId) -> Self {
        Self {
            store,
            plan,
            source,
            error: RefCell::new(None),
        }
    }

    /// First error met while expanding, if any
    pub(crate) fn finish(self) -> GraphResult<()> {
        match self.error.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn record(&self, err: impl Into<GraphError>) {
        let mut error = self.error.borrow_mut();
        if error.is_none() {
            *error = Some(err.into());
        }
    }

    /// Candidate edges around `vertex` with the direction they are walked in, and the
    /// cost of entering `vertex` itself
    fn candidates(&self, vertex: VertexId, backwards: bool) -> Option<(Vec<(EdgeId, Direction)>, f64)> {
        let slot = self.store.get_vertex(vertex)?;
        let model = match slot.read() {
            Ok(model) => model,
            Err(err) => {
                self.record(err);
                return None;
            }
        };

        // Walking backwards, an edge followed along its orientation arrives through in_edges
        let (along, against) = if backwards {
            (&model.in_edges, &model.out_edges)
        } else {
            (&model.out_edges, &model.in_edges)
        };
        let mut edges = Vec::new();
        let mut take = |adjacency: &crate::graph::Adjacency, direction: Direction| {
            edges.extend(
                adjacency
                    .iter()
                    .filter(|(edge_type, _)| self.plan.allows_type(*edge_type))
                    .map(|(_, id)| (id, direction)),
            );
        };
        if matches!(self.plan.direction, Direction::Outgoing | Direction::Both) {
            take(along, Direction::Outgoing);
        }
        if matches!(self.plan.direction, Direction::Incoming | Direction::Both) {
            take(against, Direction::Incoming);
        }

        let entry_cost = if backwards { self.plan.vertex_cost(&model) } else { 0.0 };
        Some((edges, entry_cost))
    }

    /// Neighbour reached over an accepted edge, and the edge's cost
    fn follow(&self, id: EdgeId, direction: Direction, backwards: bool) -> Option<(VertexId, f64)> {
        let slot = self.store.get_edge(id)?;
        let edge = match slot.read() {
            Ok(edge) => edge,
            Err(err) => {
                self.record(err);
                return None;
            }
        };
        if !self.plan.filters.accepts_edge(&edge) {
            return None;
        }
        let neighbour = match (direction, backwards) {
            (Direction::Incoming, false) | (Direction::Outgoing, true) => edge.source,
            _ => edge.target,
        };
        Some((neighbour, self.plan.edge_cost.cost(&edge)))
    }

    /// Whether `vertex` may be entered, and what entering it costs
    fn admit(&self, vertex: VertexId) -> Option<f64> {
        if !self.plan.reads_vertices {
            return Some(0.0);
        }
        let slot = self.store.get_vertex(vertex)?;
        let model = match slot.read() {
            Ok(model) => model,
            Err(err) => {
                self.record(err);
                return None;
            }
        };
        if vertex != self.source && !self.plan.accepts_vertex(&model) {
            return None;
        }
        Some(self.plan.vertex_cost(&model))
    }

    fn expand<F>(&self, node: NodeId, backwards: bool, mut visit: F)
    where
        F: FnMut(Step<Hop>),
    {
        if self.error.borrow().is_some() {
            return;
        }
        let vertex = VertexId(node);
        let Some((candidates, entry_cost)) = self.candidates(vertex, backwards) else {
            return;
        };

        for (edge_id, direction) in candidates {
            let Some((neighbour, edge_cost)) = self.follow(edge_id, direction, backwards) else {
                continue;
            };
            let Some(neighbour_cost) = self.admit(neighbour) else {
                continue;
            };
            let entered_cost = if backwards { entry_cost } else { neighbour_cost };
            let weight = edge_cost + entered_cost;
            visit(Step {
                node: neighbour.0,
                edge: Hop {
                    edge: edge_id,
                    direction,
                    weight,
                },
                cost: weight,
            });
        }
    }
}

impl Neighborhood for StoreNeighborhood<'_> {
    type Edge = Hop;

    fn for_each_successor<F>(&self, node: NodeId, visit: F)
    where
        F: FnMut(Step<Hop>),
    {
        self.expand(node, false, visit);
    }

    fn for_each_predecessor<F>(&self, node: NodeId, visit: F)
    where
        F: FnMut(Step<Hop>),
    {
        self.expand(node, true, visit);
    }
}
