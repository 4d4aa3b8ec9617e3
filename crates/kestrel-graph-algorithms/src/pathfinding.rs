//! Pathfinding kernels
//!
//! All kernels report neighbours in the order the [`Neighborhood`] yields them, so
//! equal-cost alternatives resolve to whichever was discovered first.

use super::common::{unwind, Neighborhood, NodeId, PathResult};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Breadth-First Search (unweighted shortest path to the nearest of `targets`)
///
/// `max_depth` bounds the number of hops; `None` means unbounded.
pub fn bfs<N: Neighborhood>(
    nb: &N,
    source: NodeId,
    targets: &[NodeId],
    max_depth: Option<usize>,
) -> Option<PathResult<N::Edge>> {
    if targets.contains(&source) {
        return Some(trivial(source));
    }
    let target_set: FxHashSet<NodeId> = targets.iter().copied().collect();
    let limit = max_depth.unwrap_or(usize::MAX);

    let mut parents: FxHashMap<NodeId, Option<(NodeId, N::Edge)>> = FxHashMap::default();
    let mut queue = VecDeque::new();
    parents.insert(source, None);
    queue.push_back((source, 0usize));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= limit {
            continue;
        }
        let mut found = None;
        nb.for_each_successor(current, |step| {
            if found.is_some() || parents.contains_key(&step.node) {
                return;
            }
            parents.insert(step.node, Some((current, step.edge)));
            if target_set.contains(&step.node) {
                found = Some(step.node);
            } else {
                queue.push_back((step.node, depth + 1));
            }
        });

        if let Some(target) = found {
            let (nodes, edges) = unwind(&parents, target);
            return Some(PathResult {
                source,
                target,
                cost: edges.len() as f64,
                nodes,
                edges,
            });
        }
    }

    None
}

/// Bidirectional level-synchronous BFS between one source and one target.
///
/// Both searches advance one whole level at a time; the smaller frontier moves first.
/// The search ends on the first level where the two visited sets meet.
pub fn bidirectional_bfs<N: Neighborhood>(
    nb: &N,
    source: NodeId,
    target: NodeId,
    max_depth: Option<usize>,
) -> Option<PathResult<N::Edge>> {
    if source == target {
        return Some(trivial(source));
    }
    let limit = max_depth.unwrap_or(usize::MAX);

    // node -> (distance from the search origin, parent link)
    let mut forward: FxHashMap<NodeId, (usize, Option<(NodeId, N::Edge)>)> = FxHashMap::default();
    let mut backward: FxHashMap<NodeId, (usize, Option<(NodeId, N::Edge)>)> = FxHashMap::default();
    forward.insert(source, (0, None));
    backward.insert(target, (0, None));

    let mut forward_frontier = vec![source];
    let mut backward_frontier = vec![target];
    let mut forward_level = 0usize;
    let mut backward_level = 0usize;

    while !forward_frontier.is_empty() && !backward_frontier.is_empty() {
        if forward_level + backward_level >= limit {
            return None;
        }

        let expand_forward = forward_frontier.len() <= backward_frontier.len();
        let mut next = Vec::new();
        // (total hops, meeting node)
        let mut best: Option<(usize, NodeId)> = None;

        if expand_forward {
            for &current in &forward_frontier {
                nb.for_each_successor(current, |step| {
                    if forward.contains_key(&step.node) {
                        return;
                    }
                    forward.insert(step.node, (forward_level + 1, Some((current, step.edge))));
                    if let Some((depth, _)) = backward.get(&step.node) {
                        let total = forward_level + 1 + depth;
                        if best.map_or(true, |(b, _)| total < b) {
                            best = Some((total, step.node));
                        }
                    }
                    next.push(step.node);
                });
            }
            forward_frontier = next;
            forward_level += 1;
        } else {
            for &current in &backward_frontier {
                nb.for_each_predecessor(current, |step| {
                    if backward.contains_key(&step.node) {
                        return;
                    }
                    backward.insert(step.node, (backward_level + 1, Some((current, step.edge))));
                    if let Some((depth, _)) = forward.get(&step.node) {
                        let total = backward_level + 1 + depth;
                        if best.map_or(true, |(b, _)| total < b) {
                            best = Some((total, step.node));
                        }
                    }
                    next.push(step.node);
                });
            }
            backward_frontier = next;
            backward_level += 1;
        }

        if let Some((total, meeting)) = best {
            if total > limit {
                return None;
            }
            return Some(join(source, target, meeting, &forward, &backward));
        }
    }

    None
}

fn join<E: Copy>(
    source: NodeId,
    target: NodeId,
    meeting: NodeId,
    forward: &FxHashMap<NodeId, (usize, Option<(NodeId, E)>)>,
    backward: &FxHashMap<NodeId, (usize, Option<(NodeId, E)>)>,
) -> PathResult<E> {
    let mut nodes = vec![meeting];
    let mut edges = Vec::new();
    let mut current = meeting;
    while let Some((_, Some((parent, edge)))) = forward.get(&current) {
        nodes.push(*parent);
        edges.push(*edge);
        current = *parent;
    }
    nodes.reverse();
    edges.reverse();

    // Backward links already point in travel direction: meeting -> ... -> target
    current = meeting;
    while let Some((_, Some((next, edge)))) = backward.get(&current) {
        nodes.push(*next);
        edges.push(*edge);
        current = *next;
    }

    PathResult {
        source,
        target,
        cost: edges.len() as f64,
        nodes,
        edges,
    }
}

/// State for Dijkstra priority queue
#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    /// Insertion sequence, breaks cost ties in discovery order
    seq: u64,
    node: NodeId,
}

impl Eq for State {}

// Rust's BinaryHeap is max-heap, so both keys are compared reversed
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra's Algorithm (cost-weighted shortest path to the nearest of `targets`)
///
/// The cost of a hop is the step cost plus [`Neighborhood::node_cost`] of the node entered.
/// Negative or NaN hop costs are skipped. `max_depth` stops expansion of nodes whose
/// current best path already has that many hops.
pub fn dijkstra<N: Neighborhood>(
    nb: &N,
    source: NodeId,
    targets: &[NodeId],
    max_depth: Option<usize>,
) -> Option<PathResult<N::Edge>> {
    if targets.contains(&source) {
        return Some(trivial(source));
    }
    let target_set: FxHashSet<NodeId> = targets.iter().copied().collect();
    let limit = max_depth.unwrap_or(usize::MAX);

    let mut dist: FxHashMap<NodeId, (f64, usize)> = FxHashMap::default();
    let mut parents: FxHashMap<NodeId, Option<(NodeId, N::Edge)>> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    dist.insert(source, (0.0, 0));
    parents.insert(source, None);
    heap.push(State { cost: 0.0, seq, node: source });

    while let Some(State { cost, node, .. }) = heap.pop() {
        if target_set.contains(&node) {
            let (nodes, edges) = unwind(&parents, node);
            return Some(PathResult {
                source,
                target: node,
                nodes,
                edges,
                cost,
            });
        }

        let (best, hops) = dist.get(&node).copied().unwrap_or((f64::INFINITY, 0));
        if cost > best || hops >= limit {
            continue;
        }

        nb.for_each_successor(node, |step| {
            let weight = step.cost + nb.node_cost(step.node);
            if weight.is_nan() || weight < 0.0 {
                return;
            }
            let next_cost = cost + weight;
            let known = dist.get(&step.node).map_or(f64::INFINITY, |(c, _)| *c);
            if next_cost < known {
                dist.insert(step.node, (next_cost, hops + 1));
                parents.insert(step.node, Some((node, step.edge)));
                seq += 1;
                heap.push(State { cost: next_cost, seq, node: step.node });
            }
        });
    }

    None
}

/// Bounded depth-first enumeration of simple paths.
///
/// With a non-empty `targets`, reports paths that end on a target (a target is not
/// expanded further). With no targets, every simple path of one or more hops is reported.
/// Paths come out in depth-first discovery order; at most `max_paths` are returned.
pub fn all_paths<N: Neighborhood>(
    nb: &N,
    source: NodeId,
    targets: &[NodeId],
    max_depth: usize,
    max_paths: usize,
) -> Vec<PathResult<N::Edge>> {
    struct Frame<E> {
        nodes: Vec<NodeId>,
        edges: Vec<E>,
        cost: f64,
    }

    let target_set: FxHashSet<NodeId> = targets.iter().copied().collect();
    let mut results = Vec::new();
    let mut stack = vec![Frame::<N::Edge> {
        nodes: vec![source],
        edges: Vec::new(),
        cost: 0.0,
    }];

    while let Some(frame) = stack.pop() {
        if results.len() >= max_paths {
            break;
        }
        let Some(&tail) = frame.nodes.last() else {
            continue;
        };

        if !frame.edges.is_empty() {
            let hit = target_set.is_empty() || target_set.contains(&tail);
            if hit {
                results.push(PathResult {
                    source,
                    target: tail,
                    nodes: frame.nodes.clone(),
                    edges: frame.edges.clone(),
                    cost: frame.cost,
                });
            }
            if target_set.contains(&tail) {
                continue;
            }
        }
        if frame.edges.len() >= max_depth {
            continue;
        }

        let mut children = Vec::new();
        nb.for_each_successor(tail, |step| {
            if frame.nodes.contains(&step.node) {
                return;
            }
            let mut nodes = frame.nodes.clone();
            nodes.push(step.node);
            let mut edges = frame.edges.clone();
            edges.push(step.edge);
            children.push(Frame {
                nodes,
                edges,
                cost: frame.cost + step.cost + nb.node_cost(step.node),
            });
        });
        // Reverse so the first neighbour is explored first
        stack.extend(children.into_iter().rev());
    }

    results
}

fn trivial<E>(node: NodeId) -> PathResult<E> {
    PathResult {
        source: node,
        target: node,
        nodes: vec![node],
        edges: Vec::new(),
        cost: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::GraphView;

    /// 1->2 (10), 1->3 (50), 2->3 (5), 2->4 (100), 3->4 (1)
    fn diamond() -> GraphView {
        GraphView::from_adjacency_list(
            vec![1, 2, 3, 4],
            vec![vec![1, 2], vec![2, 3], vec![3], vec![]],
            Some(vec![vec![10.0, 50.0], vec![5.0, 100.0], vec![1.0], vec![]]),
        )
    }

    #[test]
    fn test_bfs() {
        let view = diamond();
        let result = bfs(&view, 1, &[4], None).unwrap();
        assert_eq!(result.nodes, vec![1, 2, 4]);
        assert_eq!(result.hops(), 2);
        assert_eq!(result.cost, 2.0);
    }

    #[test]
    fn test_bfs_depth_limit() {
        let view = diamond();
        assert!(bfs(&view, 1, &[4], Some(1)).is_none());
        assert!(bfs(&view, 1, &[4], Some(2)).is_some());
    }

    #[test]
    fn test_bfs_source_is_target() {
        let view = diamond();
        let result = bfs(&view, 2, &[2], None).unwrap();
        assert_eq!(result.nodes, vec![2]);
        assert!(result.edges.is_empty());
    }

    #[test]
    fn test_bidirectional_matches_bfs_length() {
        let view = diamond();
        let result = bidirectional_bfs(&view, 1, 4, None).unwrap();
        assert_eq!(result.nodes.first(), Some(&1));
        assert_eq!(result.nodes.last(), Some(&4));
        assert_eq!(result.hops(), 2);
        assert_eq!(result.edges.len(), result.nodes.len() - 1);
    }

    #[test]
    fn test_bidirectional_unreachable() {
        let view = diamond();
        assert!(bidirectional_bfs(&view, 4, 1, None).is_none());
    }

    #[test]
    fn test_dijkstra() {
        let view = diamond();
        // 1->2 (10) ->3 (5) ->4 (1) = 16 beats 1->2->4 = 110 and 1->3->4 = 51
        let result = dijkstra(&view, 1, &[4], None).unwrap();
        assert_eq!(result.nodes, vec![1, 2, 3, 4]);
        assert_eq!(result.cost, 16.0);
    }

    #[test]
    fn test_dijkstra_equal_cost_uses_discovery_order() {
        // 1->2->4 and 1->3->4, all weights 1
        let view = GraphView::from_adjacency_list(
            vec![1, 2, 3, 4],
            vec![vec![1, 2], vec![3], vec![3], vec![]],
            None,
        );
        let result = dijkstra(&view, 1, &[4], None).unwrap();
        assert_eq!(result.nodes, vec![1, 2, 4]);
    }

    #[test]
    fn test_all_paths() {
        let view = diamond();
        let paths = all_paths(&view, 1, &[4], 5, 10);
        let routes: Vec<Vec<NodeId>> = paths.iter().map(|p| p.nodes.clone()).collect();
        assert_eq!(
            routes,
            vec![vec![1, 2, 3, 4], vec![1, 2, 4], vec![1, 3, 4]]
        );
    }

    #[test]
    fn test_all_paths_without_targets_respects_limits() {
        let view = diamond();
        let paths = all_paths(&view, 1, &[], 1, 10);
        assert_eq!(paths.len(), 2);
        let capped = all_paths(&view, 1, &[], 5, 3);
        assert_eq!(capped.len(), 3);
    }
}
