//! Property scans over store snapshots
//!
//! A scan copies the slot list of the store, then evaluates each element under its own
//! read guard only. Large snapshots are filtered on the rayon pool; results keep id order
//! either way.

use super::expression::{MismatchPolicy, PropertyExpression};
use super::operator::BinaryOperator;
use crate::concurrency::Guarded;
use crate::config::ScanConfig;
use crate::graph::{
    EdgeRef, ElementId, GraphElement, GraphError, GraphResult, GraphStore, Label, PropertyId,
    PropertyValue, VertexRef,
};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// Which element kinds a scan visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanTarget {
    #[default]
    Vertices,
    Edges,
    All,
}

impl ScanTarget {
    fn vertices(self) -> bool {
        matches!(self, ScanTarget::Vertices | ScanTarget::All)
    }

    fn edges(self) -> bool {
        matches!(self, ScanTarget::Edges | ScanTarget::All)
    }
}

/// Element returned by a scan
#[derive(Debug, Clone)]
pub enum ScannedElement {
    Vertex(VertexRef),
    Edge(EdgeRef),
}

impl ScannedElement {
    pub fn as_vertex(&self) -> Option<&VertexRef> {
        match self {
            ScannedElement::Vertex(vertex) => Some(vertex),
            ScannedElement::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeRef> {
        match self {
            ScannedElement::Edge(edge) => Some(edge),
            ScannedElement::Vertex(_) => None,
        }
    }

    pub fn element_id(&self) -> GraphResult<ElementId> {
        Ok(match self {
            ScannedElement::Vertex(vertex) => ElementId::Vertex(vertex.read()?.id),
            ScannedElement::Edge(edge) => ElementId::Edge(edge.read()?.id),
        })
    }

    /// Copy of one property, taken under the element's read guard
    pub fn property(&self, property_id: PropertyId) -> GraphResult<Option<PropertyValue>> {
        Ok(match self {
            ScannedElement::Vertex(vertex) => vertex.read()?.property(property_id).cloned(),
            ScannedElement::Edge(edge) => edge.read()?.property(property_id).cloned(),
        })
    }
}

/// Runs scans against one store
pub struct GraphScanner<'a> {
    store: &'a GraphStore,
    config: ScanConfig,
}

impl<'a> GraphScanner<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self::with_config(store, ScanConfig::default())
    }

    pub fn with_config(store: &'a GraphStore, config: ScanConfig) -> Self {
        Self { store, config }
    }

    pub fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.config.mismatch_policy = policy;
        self
    }

    /// `property <operator> value` over the elements selected by `target`
    pub fn graph_scan(
        &self,
        property_id: PropertyId,
        value: PropertyValue,
        operator: BinaryOperator,
        target: ScanTarget,
    ) -> GraphResult<Vec<ScannedElement>> {
        let expression = PropertyExpression::new(property_id, operator, value);
        self.scan(&expression, target)
    }

    pub fn scan(&self, expression: &PropertyExpression, target: ScanTarget) -> GraphResult<Vec<ScannedElement>> {
        let _gate = self.store.read_gate();
        let mut found = Vec::new();
        if target.vertices() {
            found.extend(self.vertex_scan(expression)?.into_iter().map(ScannedElement::Vertex));
        }
        if target.edges() {
            found.extend(self.edge_scan(expression)?.into_iter().map(ScannedElement::Edge));
        }
        debug!(%expression, ?target, matches = found.len(), "graph scan");
        Ok(found)
    }

    pub fn vertex_scan(&self, expression: &PropertyExpression) -> GraphResult<Vec<VertexRef>> {
        let _gate = self.store.read_gate();
        let policy = self.config.mismatch_policy;
        self.filter(self.store.vertices(), |vertex| expression.matches(vertex, policy))
    }

    pub fn edge_scan(&self, expression: &PropertyExpression) -> GraphResult<Vec<EdgeRef>> {
        let _gate = self.store.read_gate();
        let policy = self.config.mismatch_policy;
        self.filter(self.store.edges(), |edge| expression.matches(edge, policy))
    }

    /// Elements carrying exactly `label`
    pub fn label_scan(&self, label: &Label, target: ScanTarget) -> GraphResult<Vec<ScannedElement>> {
        let _gate = self.store.read_gate();
        let mut found = Vec::new();
        if target.vertices() {
            let vertices = self.filter(self.store.vertices(), |vertex| Ok(vertex.label.as_ref() == Some(label)))?;
            found.extend(vertices.into_iter().map(ScannedElement::Vertex));
        }
        if target.edges() {
            let edges = self.filter(self.store.edges(), |edge| Ok(edge.label.as_ref() == Some(label)))?;
            found.extend(edges.into_iter().map(ScannedElement::Edge));
        }
        Ok(found)
    }

    /// Compare `value` against the keys of a named index.
    ///
    /// Keys the operator cannot compare with `value` follow the mismatch policy. Elements
    /// removed since they were indexed are left out.
    pub fn index_scan(
        &self,
        index: &str,
        value: &PropertyValue,
        operator: BinaryOperator,
    ) -> GraphResult<Vec<ScannedElement>> {
        let _gate = self.store.read_gate();
        let ids = match operator {
            // Index keys are ordered by kind first, so 30 and 30.0 sit apart; numbers compare by value
            BinaryOperator::Equals if value.as_number().is_none() => self.store.indices().lookup(index, value)?,
            _ => {
                let handle = self.store.indices().get_index(index)?;
                let index = handle.read();
                let mut ids = Vec::new();
                for (key, elements) in index.entries() {
                    match operator.evaluate(key, value) {
                        Ok(true) => ids.extend(elements.iter().copied()),
                        Ok(false) => {}
                        Err(err) if skip(&err, self.config.mismatch_policy) => {}
                        Err(err) => return Err(err),
                    }
                }
                ids.sort();
                ids
            }
        };
        Ok(self.resolve(ids))
    }

    /// Keys between `lower` and `upper`; a missing bound is open
    pub fn range_index_scan(
        &self,
        index: &str,
        lower: Option<&PropertyValue>,
        upper: Option<&PropertyValue>,
        include_lower: bool,
        include_upper: bool,
    ) -> GraphResult<Vec<ScannedElement>> {
        let _gate = self.store.read_gate();
        let ids = self
            .store
            .indices()
            .range(index, lower, upper, include_lower, include_upper)?;
        Ok(self.resolve(ids))
    }

    fn resolve(&self, ids: Vec<ElementId>) -> Vec<ScannedElement> {
        ids.into_iter()
            .filter_map(|id| match id {
                ElementId::Vertex(id) => self.store.get_vertex(id).map(ScannedElement::Vertex),
                ElementId::Edge(id) => self.store.get_edge(id).map(ScannedElement::Edge),
            })
            .collect()
    }

    fn filter<T, F>(&self, slots: Vec<Arc<Guarded<T>>>, test: F) -> GraphResult<Vec<Arc<Guarded<T>>>>
    where
        T: Send + Sync,
        F: Fn(&T) -> GraphResult<bool> + Send + Sync,
    {
        let check = |slot: Arc<Guarded<T>>| -> Option<GraphResult<Arc<Guarded<T>>>> {
            let matched = match slot.read() {
                Ok(guard) => test(&guard),
                Err(err) => Err(GraphError::from(err)),
            };
            match matched {
                Ok(true) => Some(Ok(slot)),
                Ok(false) => None,
                Err(err) => Some(Err(err)),
            }
        };

        if slots.len() >= self.config.parallel_threshold {
            slots.into_par_iter().filter_map(check).collect()
        } else {
            slots.into_iter().filter_map(check).collect()
        }
    }
}

fn skip(err: &GraphError, policy: MismatchPolicy) -> bool {
    err.is_type_mismatch() && policy == MismatchPolicy::Skip
}
