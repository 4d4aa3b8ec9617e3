//! Shared types for the traversal kernels
//!
//! Kernels never touch a concrete store. They walk any topology that implements
//! [`Neighborhood`], which keeps the inner loop monomorphized per caller.

use rustc_hash::FxHashMap;

/// Node Identifier type (dense u32)
pub type NodeId = u32;

/// One hop out of a node: the neighbour reached, the connecting edge and its cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step<E> {
    pub node: NodeId,
    pub edge: E,
    pub cost: f64,
}

/// A topology the kernels can expand.
///
/// `for_each_successor` follows edges in the traversal direction,
/// `for_each_predecessor` follows them backwards (used by bidirectional search).
/// Implementations must report neighbours in a stable order; the kernels rely on it
/// to break ties.
pub trait Neighborhood {
    /// Edge handle carried along the path
    type Edge: Copy;

    fn for_each_successor<F>(&self, node: NodeId, visit: F)
    where
        F: FnMut(Step<Self::Edge>);

    fn for_each_predecessor<F>(&self, node: NodeId, visit: F)
    where
        F: FnMut(Step<Self::Edge>);

    /// Cost of entering `node`. Added on top of the edge cost by weighted kernels.
    fn node_cost(&self, _node: NodeId) -> f64 {
        0.0
    }
}

/// Result of a pathfinding kernel
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathResult<E> {
    pub source: NodeId,
    pub target: NodeId,
    /// Nodes from source to target inclusive
    pub nodes: Vec<NodeId>,
    /// Edges between consecutive nodes, `edges.len() == nodes.len() - 1`
    pub edges: Vec<E>,
    pub cost: f64,
}

impl<E> PathResult<E> {
    pub fn hops(&self) -> usize {
        self.edges.len()
    }
}

/// Walks a parent map back from `target` and returns nodes and edges in forward order.
pub(crate) fn unwind<E: Copy>(
    parents: &FxHashMap<NodeId, Option<(NodeId, E)>>,
    target: NodeId,
) -> (Vec<NodeId>, Vec<E>) {
    let mut nodes = vec![target];
    let mut edges = Vec::new();
    let mut current = target;
    while let Some(Some((parent, edge))) = parents.get(&current) {
        nodes.push(*parent);
        edges.push(*edge);
        current = *parent;
    }
    nodes.reverse();
    edges.reverse();
    (nodes, edges)
}

/// A dense, integer-indexed view of a topology in Compressed Sparse Row (CSR) format.
///
/// Edge handles are positions in `out_targets`.
pub struct GraphView {
    /// Number of nodes
    pub node_count: usize,
    /// Mapping from dense index (0..N) back to NodeId
    pub index_to_node: Vec<NodeId>,
    /// Mapping from NodeId to dense index
    pub node_to_index: FxHashMap<NodeId, usize>,

    /// Offsets into `out_targets`. Size = node_count + 1
    pub out_offsets: Vec<usize>,
    /// Contiguous array of target node indices
    pub out_targets: Vec<usize>,

    /// Offsets into `in_sources`. Size = node_count + 1
    pub in_offsets: Vec<usize>,
    /// Contiguous array of source node indices
    pub in_sources: Vec<usize>,
    /// Position in `out_targets` of the edge each `in_sources` entry came from
    pub in_edges: Vec<usize>,

    /// Edge weights: aligned with `out_targets`
    pub weights: Option<Vec<f64>>,
}

impl GraphView {
    /// Get the out-degree of a node (by index)
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_offsets[idx + 1] - self.out_offsets[idx]
    }

    /// Get the in-degree of a node (by index)
    pub fn in_degree(&self, idx: usize) -> usize {
        self.in_offsets[idx + 1] - self.in_offsets[idx]
    }

    /// Get outgoing neighbors (successors) of a node
    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.out_targets[self.out_offsets[idx]..self.out_offsets[idx + 1]]
    }

    /// Get incoming neighbors (predecessors) of a node
    pub fn predecessors(&self, idx: usize) -> &[usize] {
        &self.in_sources[self.in_offsets[idx]..self.in_offsets[idx + 1]]
    }

    fn weight_at(&self, position: usize) -> f64 {
        self.weights.as_ref().map(|w| w[position]).unwrap_or(1.0)
    }

    /// Build a view from adjacency lists keyed by dense index
    pub fn from_adjacency_list(
        index_to_node: Vec<NodeId>,
        outgoing: Vec<Vec<usize>>,
        weights: Option<Vec<Vec<f64>>>,
    ) -> Self {
        let node_count = index_to_node.len();
        let node_to_index = index_to_node
            .iter()
            .enumerate()
            .map(|(idx, &id)| (id, idx))
            .collect();

        let mut out_offsets = Vec::with_capacity(node_count + 1);
        let mut out_targets = Vec::new();
        let mut flat_weights = weights.as_ref().map(|_| Vec::new());
        let mut incoming: Vec<Vec<(usize, usize)>> = vec![Vec::new(); node_count];

        out_offsets.push(0);
        for (i, neighbors) in outgoing.into_iter().enumerate() {
            for target in neighbors {
                incoming[target].push((i, out_targets.len()));
                out_targets.push(target);
            }
            out_offsets.push(out_targets.len());

            if let (Some(flat), Some(rows)) = (flat_weights.as_mut(), weights.as_ref()) {
                flat.extend(rows[i].iter());
            }
        }

        let mut in_offsets = Vec::with_capacity(node_count + 1);
        let mut in_sources = Vec::new();
        let mut in_edges = Vec::new();
        in_offsets.push(0);
        for sources in incoming {
            for (source, position) in sources {
                in_sources.push(source);
                in_edges.push(position);
            }
            in_offsets.push(in_sources.len());
        }

        GraphView {
            node_count,
            index_to_node,
            node_to_index,
            out_offsets,
            out_targets,
            in_offsets,
            in_sources,
            in_edges,
            weights: flat_weights,
        }
    }
}

impl Neighborhood for GraphView {
    type Edge = usize;

    fn for_each_successor<F>(&self, node: NodeId, mut visit: F)
    where
        F: FnMut(Step<usize>),
    {
        let Some(&idx) = self.node_to_index.get(&node) else {
            return;
        };
        for position in self.out_offsets[idx]..self.out_offsets[idx + 1] {
            visit(Step {
                node: self.index_to_node[self.out_targets[position]],
                edge: position,
                cost: self.weight_at(position),
            });
        }
    }

    fn for_each_predecessor<F>(&self, node: NodeId, mut visit: F)
    where
        F: FnMut(Step<usize>),
    {
        let Some(&idx) = self.node_to_index.get(&node) else {
            return;
        };
        for slot in self.in_offsets[idx]..self.in_offsets[idx + 1] {
            let position = self.in_edges[slot];
            visit(Step {
                node: self.index_to_node[self.in_sources[slot]],
                edge: position,
                cost: self.weight_at(position),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_view_projection() {
        // 10 -> 20 -> 30, 10 -> 30
        let view = GraphView::from_adjacency_list(
            vec![10, 20, 30],
            vec![vec![1, 2], vec![2], vec![]],
            None,
        );

        assert_eq!(view.node_count, 3);
        assert_eq!(view.out_degree(0), 2);
        assert_eq!(view.in_degree(2), 2);
        assert_eq!(view.successors(0), &[1, 2]);
        assert_eq!(view.predecessors(2), &[0, 1]);

        let mut seen = Vec::new();
        view.for_each_predecessor(30, |step| seen.push((step.node, step.edge)));
        assert_eq!(seen, vec![(10, 1), (20, 2)]);
    }

    #[test]
    fn test_unknown_node_has_no_neighbours() {
        let view = GraphView::from_adjacency_list(vec![1], vec![vec![]], None);
        let mut count = 0;
        view.for_each_successor(99, |_| count += 1);
        assert_eq!(count, 0);
    }
}
