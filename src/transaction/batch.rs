//! Batches of pending create operations

use crate::graph::{
    EdgeType, GraphError, GraphResult, Label, Properties, Timestamp, VertexId,
};

/// Edge endpoint inside a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// A vertex that is already live in the store
    Existing(VertexId),
    /// The n-th vertex created earlier in the same transaction
    Pending(usize),
}

impl From<VertexId> for Endpoint {
    fn from(id: VertexId) -> Self {
        Endpoint::Existing(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexSpec {
    pub creation_timestamp: Timestamp,
    pub label: Option<Label>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub source: Endpoint,
    pub edge_type: EdgeType,
    pub target: Endpoint,
    pub creation_timestamp: Timestamp,
    pub label: Option<Label>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    CreateVertex(VertexSpec),
    CreateEdge(EdgeSpec),
}

/// Ordered create operations, applied together or not at all.
///
/// Nothing touches the store until the transaction is enqueued; enqueueing moves it,
/// so it cannot change afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    operations: Vec<Operation>,
    pending_vertices: usize,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a vertex; the returned endpoint can be used by later edges of this batch
    pub fn add_vertex(
        &mut self,
        creation_timestamp: Timestamp,
        label: Option<Label>,
        properties: Properties,
    ) -> Endpoint {
        self.operations.push(Operation::CreateVertex(VertexSpec {
            creation_timestamp,
            label,
            properties,
        }));
        self.pending_vertices += 1;
        Endpoint::Pending(self.pending_vertices - 1)
    }

    pub fn add_edge(
        &mut self,
        source: impl Into<Endpoint>,
        edge_type: EdgeType,
        target: impl Into<Endpoint>,
        creation_timestamp: Timestamp,
    ) -> &mut Self {
        self.add_edge_with(source, edge_type, target, creation_timestamp, None, Properties::new())
    }

    pub fn add_edge_with(
        &mut self,
        source: impl Into<Endpoint>,
        edge_type: EdgeType,
        target: impl Into<Endpoint>,
        creation_timestamp: Timestamp,
        label: Option<Label>,
        properties: Properties,
    ) -> &mut Self {
        self.operations.push(Operation::CreateEdge(EdgeSpec {
            source: source.into(),
            edge_type,
            target: target.into(),
            creation_timestamp,
            label,
            properties,
        }));
        self
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.pending_vertices
    }

    pub fn edge_count(&self) -> usize {
        self.operations.len() - self.pending_vertices
    }

    /// Reject pending endpoints that point at a vertex not created before the edge
    pub fn check_endpoints(&self) -> GraphResult<()> {
        let mut vertices_so_far = 0;
        for (position, operation) in self.operations.iter().enumerate() {
            match operation {
                Operation::CreateVertex(_) => vertices_so_far += 1,
                Operation::CreateEdge(edge) => {
                    for endpoint in [edge.source, edge.target] {
                        if let Endpoint::Pending(index) = endpoint {
                            if index >= vertices_so_far {
                                return Err(GraphError::Validation(format!(
                                    "operation {} refers to pending vertex {} before it is created",
                                    position, index
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tracks_pending_vertices() {
        let mut tx = Transaction::new();
        let a = tx.add_vertex(1, Some(Label::new("person")), Properties::new());
        let b = tx.add_vertex(1, None, Properties::new());
        tx.add_edge(a, EdgeType(0), b, 2)
            .add_edge(b, EdgeType(1), VertexId(40), 2);

        assert_eq!(a, Endpoint::Pending(0));
        assert_eq!(b, Endpoint::Pending(1));
        assert_eq!(tx.len(), 4);
        assert_eq!(tx.vertex_count(), 2);
        assert_eq!(tx.edge_count(), 2);
        assert!(tx.check_endpoints().is_ok());
    }

    #[test]
    fn test_forward_reference_is_rejected() {
        let mut tx = Transaction::new();
        tx.add_edge(Endpoint::Pending(0), EdgeType(0), VertexId(1), 0);
        tx.add_vertex(0, None, Properties::new());

        let err = tx.check_endpoints().unwrap_err();
        assert!(err.is_validation());
    }
}
