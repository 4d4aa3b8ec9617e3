//! Edge model

use super::element::impl_graph_element;
use super::property::Properties;
use super::types::{EdgeId, EdgeType, Label, Timestamp, VertexId};
use serde::{Deserialize, Serialize};

/// A directed, typed edge between two vertices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeModel {
    pub id: EdgeId,
    pub creation_timestamp: Timestamp,
    pub modification_timestamp: Timestamp,
    pub label: Option<Label>,
    pub properties: Properties,
    pub source: VertexId,
    pub target: VertexId,
    pub edge_type: EdgeType,
}

impl EdgeModel {
    pub fn new(
        id: EdgeId,
        source: VertexId,
        edge_type: EdgeType,
        target: VertexId,
        creation_timestamp: Timestamp,
    ) -> Self {
        EdgeModel {
            id,
            creation_timestamp,
            modification_timestamp: creation_timestamp,
            label: None,
            properties: Properties::new(),
            source,
            target,
            edge_type,
        }
    }

    pub fn with_label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// The endpoint opposite to `vertex`, or `None` if `vertex` is not an endpoint
    pub fn other_end(&self, vertex: VertexId) -> Option<VertexId> {
        if vertex == self.source {
            Some(self.target)
        } else if vertex == self.target {
            Some(self.source)
        } else {
            None
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl_graph_element!(EdgeModel, Edge);
