//! Vertex model with type-bucketed adjacency

use super::element::impl_graph_element;
use super::property::Properties;
use super::types::{EdgeId, EdgeType, Label, Timestamp, VertexId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Edge ids grouped by edge type, in insertion order within each bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AdjacencyImage", try_from = "AdjacencyImage")]
pub struct Adjacency(IndexMap<EdgeType, Vec<EdgeId>>);

/// Wire form of [`Adjacency`]: edge types and their buckets as parallel sequences
#[derive(Serialize, Deserialize)]
struct AdjacencyImage {
    edge_types: Vec<EdgeType>,
    buckets: Vec<Vec<EdgeId>>,
}

impl From<Adjacency> for AdjacencyImage {
    fn from(adjacency: Adjacency) -> Self {
        let (edge_types, buckets) = adjacency.0.into_iter().unzip();
        AdjacencyImage { edge_types, buckets }
    }
}

impl TryFrom<AdjacencyImage> for Adjacency {
    type Error = String;

    fn try_from(image: AdjacencyImage) -> Result<Self, Self::Error> {
        if image.edge_types.len() != image.buckets.len() {
            return Err(format!(
                "adjacency has {} edge types but {} buckets",
                image.edge_types.len(),
                image.buckets.len()
            ));
        }
        let mut map = IndexMap::with_capacity(image.edge_types.len());
        for (edge_type, bucket) in image.edge_types.into_iter().zip(image.buckets) {
            if bucket.is_empty() || map.insert(edge_type, bucket).is_some() {
                return Err(format!("adjacency bucket for {} is empty or repeated", edge_type));
            }
        }
        Ok(Adjacency(map))
    }
}

impl Adjacency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edge_type: EdgeType, edge_id: EdgeId) {
        self.0.entry(edge_type).or_default().push(edge_id);
    }

    /// Remove one edge id; empty buckets are dropped
    pub fn remove(&mut self, edge_type: EdgeType, edge_id: EdgeId) -> bool {
        let Some(bucket) = self.0.get_mut(&edge_type) else {
            return false;
        };
        let Some(position) = bucket.iter().position(|&id| id == edge_id) else {
            return false;
        };
        bucket.remove(position);
        if bucket.is_empty() {
            self.0.shift_remove(&edge_type);
        }
        true
    }

    pub fn of_type(&self, edge_type: EdgeType) -> &[EdgeId] {
        self.0.get(&edge_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_types(&self) -> impl Iterator<Item = EdgeType> + '_ {
        self.0.keys().copied()
    }

    /// Every edge id, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = (EdgeType, EdgeId)> + '_ {
        self.0
            .iter()
            .flat_map(|(&edge_type, ids)| ids.iter().map(move |&id| (edge_type, id)))
    }

    pub fn contains(&self, edge_id: EdgeId) -> bool {
        self.0.values().any(|ids| ids.contains(&edge_id))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A vertex in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexModel {
    pub id: VertexId,
    pub creation_timestamp: Timestamp,
    pub modification_timestamp: Timestamp,
    pub label: Option<Label>,
    pub properties: Properties,
    /// Edges leaving this vertex
    pub out_edges: Adjacency,
    /// Edges arriving at this vertex
    pub in_edges: Adjacency,
}

impl VertexModel {
    pub fn new(
        id: VertexId,
        creation_timestamp: Timestamp,
        label: Option<Label>,
        properties: Properties,
    ) -> Self {
        VertexModel {
            id,
            creation_timestamp,
            modification_timestamp: creation_timestamp,
            label,
            properties,
            out_edges: Adjacency::new(),
            in_edges: Adjacency::new(),
        }
    }

    pub fn outgoing_of_type(&self, edge_type: EdgeType) -> &[EdgeId] {
        self.out_edges.of_type(edge_type)
    }

    pub fn incoming_of_type(&self, edge_type: EdgeType) -> &[EdgeId] {
        self.in_edges.of_type(edge_type)
    }

    /// Edge types present on either side, outgoing first, without repeats
    pub fn incident_edge_types(&self) -> Vec<EdgeType> {
        let mut types: Vec<EdgeType> = self.out_edges.edge_types().collect();
        for edge_type in self.in_edges.edge_types() {
            if !types.contains(&edge_type) {
                types.push(edge_type);
            }
        }
        types
    }

    pub fn degree(&self) -> usize {
        self.out_edges.len() + self.in_edges.len()
    }
}

impl_graph_element!(VertexModel, Vertex);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::element::GraphElement;
    use crate::graph::types::{ElementId, PropertyId};

    #[test]
    fn test_adjacency_buckets() {
        let mut adjacency = Adjacency::new();
        adjacency.push(EdgeType(1), EdgeId(10));
        adjacency.push(EdgeType(2), EdgeId(11));
        adjacency.push(EdgeType(1), EdgeId(12));

        assert_eq!(adjacency.of_type(EdgeType(1)), &[EdgeId(10), EdgeId(12)]);
        assert_eq!(adjacency.len(), 3);
        assert_eq!(
            adjacency.iter().collect::<Vec<_>>(),
            vec![
                (EdgeType(1), EdgeId(10)),
                (EdgeType(1), EdgeId(12)),
                (EdgeType(2), EdgeId(11)),
            ]
        );

        assert!(adjacency.remove(EdgeType(2), EdgeId(11)));
        assert!(!adjacency.remove(EdgeType(2), EdgeId(11)));
        assert_eq!(adjacency.edge_types().collect::<Vec<_>>(), vec![EdgeType(1)]);
    }

    #[test]
    fn test_adjacency_wire_form_is_checked() {
        let bad = AdjacencyImage {
            edge_types: vec![EdgeType(1), EdgeType(1)],
            buckets: vec![vec![EdgeId(0)], vec![EdgeId(1)]],
        };
        let bytes = bincode::serialize(&bad).unwrap();
        assert!(bincode::deserialize::<Adjacency>(&bytes).is_err());

        let mut adjacency = Adjacency::new();
        adjacency.push(EdgeType(4), EdgeId(2));
        let bytes = bincode::serialize(&adjacency).unwrap();
        let image: AdjacencyImage = bincode::deserialize(&bytes).unwrap();
        assert_eq!(image.edge_types, vec![EdgeType(4)]);
        assert_eq!(image.buckets, vec![vec![EdgeId(2)]]);
    }

    #[test]
    fn test_vertex_element_surface() {
        let mut vertex = VertexModel::new(VertexId(3), 100, Some(Label::new("person")), Properties::new());
        vertex.properties_mut().set(PropertyId(0), "Alice".into());
        vertex.touch(200);

        assert_eq!(vertex.element_id(), ElementId::Vertex(VertexId(3)));
        assert!(vertex.has_label("person"));
        assert_eq!(vertex.creation_timestamp(), 100);
        assert_eq!(vertex.modification_timestamp(), 200);
        assert_eq!(vertex.property(PropertyId(0)).and_then(|v| v.as_string()), Some("Alice"));
    }

    #[test]
    fn test_incident_edge_types() {
        let mut vertex = VertexModel::new(VertexId(0), 0, None, Properties::new());
        vertex.out_edges.push(EdgeType(5), EdgeId(0));
        vertex.in_edges.push(EdgeType(5), EdgeId(1));
        vertex.in_edges.push(EdgeType(7), EdgeId(2));

        assert_eq!(vertex.incident_edge_types(), vec![EdgeType(5), EdgeType(7)]);
        assert_eq!(vertex.degree(), 3);
    }
}
