//! Cost functions for weighted traversals

use super::filters::NamedFn;
use crate::graph::{EdgeModel, GraphElement, PropertyId, VertexModel};

/// Named caller-supplied cost
pub type CostFn<T> = NamedFn<T, f64>;

/// Weight of following an edge
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum EdgeCost {
    /// Every edge costs 1
    #[default]
    Unit,
    /// Numeric edge property; edges without a numeric value cost 1
    Property(PropertyId),
    Custom(CostFn<EdgeModel>),
}

impl EdgeCost {
    pub fn cost(&self, edge: &EdgeModel) -> f64 {
        match self {
            EdgeCost::Unit => 1.0,
            EdgeCost::Property(property_id) => edge
                .property(*property_id)
                .and_then(|value| value.as_number())
                .unwrap_or(1.0),
            EdgeCost::Custom(func) => func.call(edge),
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, EdgeCost::Unit)
    }
}

/// Weight of entering a vertex
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum VertexCost {
    #[default]
    Zero,
    /// Numeric vertex property; vertices without one cost nothing
    Property(PropertyId),
    Custom(CostFn<VertexModel>),
}

impl VertexCost {
    pub fn cost(&self, vertex: &VertexModel) -> f64 {
        match self {
            VertexCost::Zero => 0.0,
            VertexCost::Property(property_id) => vertex
                .property(*property_id)
                .and_then(|value| value.as_number())
                .unwrap_or(0.0),
            VertexCost::Custom(func) => func.call(vertex),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, VertexCost::Zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeId, EdgeType, Properties, PropertyContainer, VertexId};

    #[test]
    fn test_edge_cost() {
        let edge = EdgeModel::new(EdgeId(0), VertexId(0), EdgeType(0), VertexId(1), 0)
            .with_properties(Properties::from(vec![
                PropertyContainer::new(PropertyId(1), 2.5),
                PropertyContainer::new(PropertyId(2), "heavy"),
            ]));
        assert_eq!(EdgeCost::Unit.cost(&edge), 1.0);
        assert_eq!(EdgeCost::Property(PropertyId(1)).cost(&edge), 2.5);
        assert_eq!(EdgeCost::Property(PropertyId(2)).cost(&edge), 1.0);
        assert_eq!(EdgeCost::Property(PropertyId(9)).cost(&edge), 1.0);
        let doubled = EdgeCost::Custom(CostFn::new("double-type", |e: &EdgeModel| {
            2.0 * f64::from(e.edge_type.as_u16() + 1)
        }));
        assert_eq!(doubled.cost(&edge), 2.0);
    }

    #[test]
    fn test_vertex_cost() {
        let vertex = VertexModel::new(
            VertexId(3),
            0,
            None,
            Properties::from(vec![PropertyContainer::new(PropertyId(0), 4i64)]),
        );
        assert_eq!(VertexCost::Zero.cost(&vertex), 0.0);
        assert_eq!(VertexCost::Property(PropertyId(0)).cost(&vertex), 4.0);
        assert_eq!(VertexCost::Property(PropertyId(1)).cost(&vertex), 0.0);
    }
}
