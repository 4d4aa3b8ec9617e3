//! In-memory graph storage
//!
//! Vertices and edges live in dense arenas addressed by id. Reads and in-place property
//! updates only take the per-element guard; the table locks inside the arenas are held
//! for a slot copy at most. Save and load go through [`GraphStore::exclusive`], which
//! waits for every other operation on the store to leave.

use super::arena::{Arena, ArenaImage, Slot};
use super::edge::EdgeModel;
use super::element::GraphElement;
use super::property::{Properties, PropertyValue};
use super::types::{
    now_timestamp, Direction, EdgeId, EdgeType, ElementId, Label, PropertyId, Timestamp, VertexId,
};
use super::vertex::{Adjacency, VertexModel};
use crate::concurrency::{ConcurrencyViolation, WriteGuard};
use crate::index::IndexManager;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("Edge {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("Invalid edge: source vertex {0} does not exist")]
    InvalidEdgeSource(VertexId),

    #[error("Invalid edge: target vertex {0} does not exist")]
    InvalidEdgeTarget(VertexId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Cannot compare {left} with {right}")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },

    #[error(transparent)]
    Concurrency(#[from] ConcurrencyViolation),

    #[error("Index '{0}' not found")]
    IndexNotFound(String),

    #[error("Index '{0}' already exists")]
    DuplicateIndex(String),

    #[error("Id space exhausted")]
    IdSpaceExhausted,
}

impl GraphError {
    /// Whether the error is a rejected input rather than a runtime failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GraphError::InvalidEdgeSource(_) | GraphError::InvalidEdgeTarget(_) | GraphError::Validation(_)
        )
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, GraphError::TypeMismatch { .. })
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Shared handle to a stored vertex
pub type VertexRef = Slot<VertexModel>;

/// Shared handle to a stored edge
pub type EdgeRef = Slot<EdgeModel>;

/// Plain copy of the whole store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphImage {
    pub vertices: ArenaImage<VertexModel>,
    pub edges: ArenaImage<EdgeModel>,
}

impl GraphImage {
    pub fn vertex_count(&self) -> usize {
        self.vertices.live().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.live().count()
    }

    /// Check ids, free lists and adjacency against each other
    pub fn validate(&self) -> GraphResult<()> {
        check_arena("vertex", &self.vertices, |v| v.id.as_u32())?;
        check_arena("edge", &self.edges, |e| e.id.as_u32())?;

        for edge in self.edges.live() {
            let source = self
                .vertices
                .get(edge.source.as_u32())
                .ok_or(GraphError::InvalidEdgeSource(edge.source))?;
            let target = self
                .vertices
                .get(edge.target.as_u32())
                .ok_or(GraphError::InvalidEdgeTarget(edge.target))?;
            if !source.outgoing_of_type(edge.edge_type).contains(&edge.id)
                || !target.incoming_of_type(edge.edge_type).contains(&edge.id)
            {
                return Err(GraphError::Validation(format!(
                    "{} is missing from its endpoints' adjacency",
                    edge.id
                )));
            }
        }

        for vertex in self.vertices.live() {
            for (side, adjacency) in [("outgoing", &vertex.out_edges), ("incoming", &vertex.in_edges)] {
                for (edge_type, edge_id) in adjacency.iter() {
                    let edge = self.edges.get(edge_id.as_u32()).ok_or_else(|| {
                        GraphError::Validation(format!(
                            "{} lists dead {} edge {}",
                            vertex.id, side, edge_id
                        ))
                    })?;
                    let endpoint = if side == "outgoing" { edge.source } else { edge.target };
                    if endpoint != vertex.id || edge.edge_type != edge_type {
                        return Err(GraphError::Validation(format!(
                            "{} lists {} edge {} that does not belong to it",
                            vertex.id, side, edge_id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_arena<T>(kind: &str, arena: &ArenaImage<T>, id_of: impl Fn(&T) -> u32) -> GraphResult<()> {
    let next = arena.ids.next as usize;
    if arena.slots.len() > next {
        return Err(GraphError::Validation(format!(
            "{} table has {} slots but only {} ids were issued",
            kind,
            arena.slots.len(),
            next
        )));
    }
    let mut free = vec![false; next];
    for &id in &arena.ids.free {
        let idx = id as usize;
        if idx >= next || free[idx] {
            return Err(GraphError::Validation(format!("{} free list entry {} is invalid", kind, id)));
        }
        free[idx] = true;
    }
    for idx in 0..next {
        let slot = arena.slots.get(idx).and_then(Option::as_ref);
        match slot {
            Some(element) if id_of(element) as usize != idx => {
                return Err(GraphError::Validation(format!(
                    "{} slot {} holds id {}",
                    kind,
                    idx,
                    id_of(element)
                )));
            }
            Some(_) if free[idx] => {
                return Err(GraphError::Validation(format!("live {} {} is on the free list", kind, idx)));
            }
            None if !free[idx] => {
                return Err(GraphError::Validation(format!("dead {} {} is not on the free list", kind, idx)));
            }
            _ => {}
        }
    }
    Ok(())
}

/// In-memory graph storage
#[derive(Debug)]
pub struct GraphStore {
    vertices: Arena<VertexModel>,
    edges: Arena<EdgeModel>,
    indices: IndexManager,
    /// Shared by every operation, exclusive for save and load
    gate: RwLock<()>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_capacity(1024, 4096)
    }

    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        GraphStore {
            vertices: Arena::with_capacity(vertices),
            edges: Arena::with_capacity(edges),
            indices: IndexManager::new(),
            gate: RwLock::new(()),
        }
    }

    /// Hold off save and load for as long as the returned guard lives.
    ///
    /// Recursive, so it can be taken again by the same thread.
    pub fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read_recursive()
    }

    /// Wait for all other operations to leave and keep them out
    pub fn exclusive(&self) -> ExclusiveStore<'_> {
        ExclusiveStore {
            store: self,
            _gate: self.gate.write(),
        }
    }

    /// Create a vertex
    pub fn create_vertex(
        &self,
        creation_timestamp: Timestamp,
        label: Option<Label>,
        properties: Properties,
    ) -> GraphResult<VertexRef> {
        let _gate = self.read_gate();
        validate_properties(&properties)?;
        let id = self.vertices.reserve()?;
        let vertex = VertexModel::new(VertexId(id), creation_timestamp, label, properties);
        Ok(self.vertices.publish(id, vertex))
    }

    /// Create an edge without label or properties
    pub fn create_edge(
        &self,
        source: VertexId,
        edge_type: EdgeType,
        target: VertexId,
        creation_timestamp: Timestamp,
    ) -> GraphResult<EdgeRef> {
        self.create_edge_with(source, edge_type, target, creation_timestamp, None, Properties::new())
    }

    /// Create an edge.
    ///
    /// Both endpoints are write-locked in ascending id order while the edge is linked
    /// into their adjacency. Fails without touching the store if either endpoint is not
    /// a live vertex.
    pub fn create_edge_with(
        &self,
        source: VertexId,
        edge_type: EdgeType,
        target: VertexId,
        creation_timestamp: Timestamp,
        label: Option<Label>,
        properties: Properties,
    ) -> GraphResult<EdgeRef> {
        let _gate = self.read_gate();
        validate_properties(&properties)?;
        let source_slot = self
            .vertices
            .get(source.as_u32())
            .ok_or(GraphError::InvalidEdgeSource(source))?;
        let target_slot = self
            .vertices
            .get(target.as_u32())
            .ok_or(GraphError::InvalidEdgeTarget(target))?;

        let id = self.edges.reserve()?;
        let mut endpoints = match lock_endpoints(&source_slot, &target_slot, source, target) {
            Ok(endpoints) => endpoints,
            Err(err) => {
                self.edges.release(id);
                return Err(err.into());
            }
        };

        // An endpoint removed between lookup and lock is no longer in its slot
        let rejection = if !self.vertices.holds(source.as_u32(), &source_slot) {
            Some(GraphError::InvalidEdgeSource(source))
        } else if !self.vertices.holds(target.as_u32(), &target_slot) {
            Some(GraphError::InvalidEdgeTarget(target))
        } else {
            None
        };
        if let Some(err) = rejection {
            drop(endpoints);
            self.edges.release(id);
            return Err(err);
        }

        let edge_id = EdgeId(id);
        let mut edge = EdgeModel::new(edge_id, source, edge_type, target, creation_timestamp)
            .with_properties(properties);
        edge.label = label;
        let slot = self.edges.publish(id, edge);
        endpoints.link(edge_type, edge_id);
        Ok(slot)
    }

    pub fn get_vertex(&self, id: VertexId) -> Option<VertexRef> {
        let _gate = self.read_gate();
        self.vertices.get(id.as_u32())
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<EdgeRef> {
        let _gate = self.read_gate();
        self.edges.get(id.as_u32())
    }

    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.get_vertex(id).is_some()
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.get_edge(id).is_some()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Live vertices in id order
    pub fn vertices(&self) -> Vec<VertexRef> {
        let _gate = self.read_gate();
        self.vertices.snapshot()
    }

    /// Live edges in id order
    pub fn edges(&self) -> Vec<EdgeRef> {
        let _gate = self.read_gate();
        self.edges.snapshot()
    }

    /// Outgoing edge ids of a vertex, optionally restricted to one type
    pub fn outgoing_edges(&self, vertex: VertexId, edge_type: Option<EdgeType>) -> GraphResult<Vec<EdgeId>> {
        self.adjacent_edges(vertex, Direction::Outgoing, edge_type)
    }

    pub fn incoming_edges(&self, vertex: VertexId, edge_type: Option<EdgeType>) -> GraphResult<Vec<EdgeId>> {
        self.adjacent_edges(vertex, Direction::Incoming, edge_type)
    }

    /// Edge ids around a vertex. The vertex guard is released before returning.
    pub fn adjacent_edges(
        &self,
        vertex: VertexId,
        direction: Direction,
        edge_type: Option<EdgeType>,
    ) -> GraphResult<Vec<EdgeId>> {
        let slot = self.get_vertex(vertex).ok_or(GraphError::VertexNotFound(vertex))?;
        let model = slot.read()?;
        let collect = |adjacency: &Adjacency, out: &mut Vec<EdgeId>| match edge_type {
            Some(edge_type) => out.extend_from_slice(adjacency.of_type(edge_type)),
            None => out.extend(adjacency.iter().map(|(_, id)| id)),
        };
        let mut ids = Vec::new();
        if matches!(direction, Direction::Outgoing | Direction::Both) {
            collect(&model.out_edges, &mut ids);
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            collect(&model.in_edges, &mut ids);
        }
        Ok(ids)
    }

    pub fn incident_edge_types(&self, vertex: VertexId) -> GraphResult<Vec<EdgeType>> {
        let slot = self.get_vertex(vertex).ok_or(GraphError::VertexNotFound(vertex))?;
        let types = slot.read()?.incident_edge_types();
        Ok(types)
    }

    /// Neighbour ids in adjacency order, repeats included for parallel edges
    pub fn neighbours(&self, vertex: VertexId, direction: Direction) -> GraphResult<Vec<VertexId>> {
        let edge_ids = self.adjacent_edges(vertex, direction, None)?;
        let mut neighbours = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            if let Some(edge) = self.get_edge(edge_id) {
                if let Some(other) = edge.read()?.other_end(vertex) {
                    neighbours.push(other);
                }
            }
        }
        Ok(neighbours)
    }

    /// Set a property in place under the element's write guard.
    ///
    /// Returns the replaced value.
    pub fn set_property(
        &self,
        element: ElementId,
        property_id: PropertyId,
        value: PropertyValue,
    ) -> GraphResult<Option<PropertyValue>> {
        self.with_element_mut(element, |model| {
            let previous = model.properties_mut().set(property_id, value);
            model.touch(now_timestamp());
            previous
        })
    }

    pub fn remove_property(&self, element: ElementId, property_id: PropertyId) -> GraphResult<Option<PropertyValue>> {
        self.with_element_mut(element, |model| {
            let removed = model.properties_mut().remove(property_id);
            if removed.is_some() {
                model.touch(now_timestamp());
            }
            removed
        })
    }

    fn with_element_mut<R>(
        &self,
        element: ElementId,
        apply: impl FnOnce(&mut dyn GraphElement) -> R,
    ) -> GraphResult<R> {
        match element {
            ElementId::Vertex(id) => {
                let slot = self.get_vertex(id).ok_or(GraphError::VertexNotFound(id))?;
                let mut guard = slot.write()?;
                Ok(apply(&mut *guard))
            }
            ElementId::Edge(id) => {
                let slot = self.get_edge(id).ok_or(GraphError::EdgeNotFound(id))?;
                let mut guard = slot.write()?;
                Ok(apply(&mut *guard))
            }
        }
    }

    /// Remove an edge and unlink it from both endpoints. The id is reusable afterwards.
    pub fn remove_edge(&self, id: EdgeId) -> GraphResult<EdgeModel> {
        let _gate = self.read_gate();
        let slot = self.edges.detach(id.as_u32()).ok_or(GraphError::EdgeNotFound(id))?;
        let edge = slot.read()?.clone();

        match (
            self.vertices.get(edge.source.as_u32()),
            self.vertices.get(edge.target.as_u32()),
        ) {
            (Some(source_slot), Some(target_slot)) => {
                lock_endpoints(&source_slot, &target_slot, edge.source, edge.target)?
                    .unlink(edge.edge_type, id);
            }
            // An endpoint is mid-removal and already detached; unlink whatever is left
            (source_slot, target_slot) => {
                if let Some(slot) = source_slot {
                    slot.write()?.out_edges.remove(edge.edge_type, id);
                }
                if let Some(slot) = target_slot {
                    slot.write()?.in_edges.remove(edge.edge_type, id);
                }
            }
        }

        self.indices.remove_element(ElementId::Edge(id));
        self.edges.release(id.as_u32());
        Ok(edge)
    }

    /// Remove a vertex together with every edge touching it
    pub fn remove_vertex(&self, id: VertexId) -> GraphResult<VertexModel> {
        let _gate = self.read_gate();
        let slot = self.vertices.get(id.as_u32()).ok_or(GraphError::VertexNotFound(id))?;
        {
            // Detaching under the write guard stops new edges from linking to it
            let _guard = slot.write()?;
            if self.vertices.detach(id.as_u32()).is_none() {
                return Err(GraphError::VertexNotFound(id));
            }
        }

        let incident: Vec<EdgeId> = {
            let vertex = slot.read()?;
            let mut ids: Vec<EdgeId> = vertex
                .out_edges
                .iter()
                .chain(vertex.in_edges.iter())
                .map(|(_, edge_id)| edge_id)
                .collect();
            ids.sort();
            ids.dedup();
            ids
        };
        debug!(vertex = %id, edges = incident.len(), "removing vertex and incident edges");
        for edge_id in incident {
            match self.remove_edge(edge_id) {
                Ok(_) | Err(GraphError::EdgeNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        self.indices.remove_element(ElementId::Vertex(id));
        self.vertices.release(id.as_u32());
        let vertex = slot.read()?.clone();
        Ok(vertex)
    }

    /// Named property indices
    pub fn indices(&self) -> &IndexManager {
        &self.indices
    }

    /// Free ids waiting for reuse, most recent last
    pub fn free_vertex_ids(&self) -> Vec<VertexId> {
        self.vertices.free_ids().into_iter().map(VertexId).collect()
    }

    pub fn free_edge_ids(&self) -> Vec<EdgeId> {
        self.edges.free_ids().into_iter().map(EdgeId).collect()
    }

    /// Drop trailing dead slots of both tables
    pub fn trim(&self) -> (usize, usize) {
        let _gate = self.read_gate();
        let dropped = (self.vertices.trim(), self.edges.trim());
        info!(vertex_slots = dropped.0, edge_slots = dropped.1, "trimmed graph store");
        dropped
    }

    /// Remove everything
    pub fn clear(&self) {
        self.exclusive().reset();
        info!("graph store cleared");
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to a store, used by snapshots
pub struct ExclusiveStore<'a> {
    store: &'a GraphStore,
    _gate: RwLockWriteGuard<'a, ()>,
}

impl ExclusiveStore<'_> {
    pub fn image(&self) -> GraphResult<GraphImage> {
        Ok(GraphImage {
            vertices: self.store.vertices.export()?,
            edges: self.store.edges.export()?,
        })
    }

    /// Replace the store content; the image must already be validated
    pub fn install(&self, image: GraphImage) {
        self.store.vertices.install(image.vertices);
        self.store.edges.install(image.edges);
    }

    pub fn indices(&self) -> &IndexManager {
        &self.store.indices
    }

    /// Back to an empty store
    pub fn reset(&self) {
        self.store.vertices.clear();
        self.store.edges.clear();
        self.store.indices.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.store.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.store.edges.len()
    }
}

fn validate_properties(properties: &Properties) -> GraphResult<()> {
    match properties.duplicate_id() {
        Some(id) => Err(GraphError::Validation(format!("property {} given twice", id))),
        None => Ok(()),
    }
}

/// Write guards on both endpoints of an edge; a self-loop holds one guard
struct Endpoints<'a> {
    source: VertexId,
    target: VertexId,
    first: WriteGuard<'a, VertexModel>,
    second: Option<WriteGuard<'a, VertexModel>>,
}

impl Endpoints<'_> {
    fn split(&mut self) -> (&mut VertexModel, Option<&mut VertexModel>) {
        let first = &mut *self.first;
        let second = self.second.as_deref_mut();
        (first, second)
    }

    fn link(&mut self, edge_type: EdgeType, edge_id: EdgeId) {
        let (source, target) = (self.source, self.target);
        let (first, second) = self.split();
        match second {
            None => {
                first.out_edges.push(edge_type, edge_id);
                first.in_edges.push(edge_type, edge_id);
            }
            Some(second) => {
                let (src, dst) = if first.id == source { (first, second) } else { (second, first) };
                debug_assert!(src.id == source && dst.id == target);
                src.out_edges.push(edge_type, edge_id);
                dst.in_edges.push(edge_type, edge_id);
            }
        }
    }

    fn unlink(&mut self, edge_type: EdgeType, edge_id: EdgeId) {
        let source = self.source;
        let (first, second) = self.split();
        match second {
            None => {
                first.out_edges.remove(edge_type, edge_id);
                first.in_edges.remove(edge_type, edge_id);
            }
            Some(second) => {
                let (src, dst) = if first.id == source { (first, second) } else { (second, first) };
                src.out_edges.remove(edge_type, edge_id);
                dst.in_edges.remove(edge_type, edge_id);
            }
        }
    }
}

/// Write-lock the endpoints in ascending id order
fn lock_endpoints<'a>(
    source_slot: &'a VertexRef,
    target_slot: &'a VertexRef,
    source: VertexId,
    target: VertexId,
) -> Result<Endpoints<'a>, ConcurrencyViolation> {
    if source == target {
        return Ok(Endpoints {
            source,
            target,
            first: source_slot.write()?,
            second: None,
        });
    }
    let (low, high) = if source < target {
        (source_slot, target_slot)
    } else {
        (target_slot, source_slot)
    };
    let first = low.write()?;
    let second = high.write()?;
    Ok(Endpoints {
        source,
        target,
        first,
        second: Some(second),
    })
}
