//! Traversal plugins
//!
//! A plugin turns a [`PathSpecification`] into a [`PathExecutor`]. The built-in plugins
//! share one executor type, monomorphized per search kernel, so the inner loop of a
//! compiled executor dispatches statically.

use super::neighborhood::{StoreNeighborhood, TraversalPlan};
use super::path::{Hop, Path};
use super::spec::PathSpecification;
use super::{PathError, PathResult};
use crate::graph::{GraphError, GraphStore, VertexId};
use kestrel_graph_algorithms::{self as algorithms, Neighborhood, NodeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::trace;

/// Depth used by [`AllPaths`] when the specification sets none
pub const DEFAULT_ALL_PATHS_DEPTH: usize = 6;

/// What kind of answer a plugin produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// At most one cheapest path to the nearest target
    ShortestPath,
    /// Any number of paths in discovery order
    Traversal,
}

/// A named traversal algorithm
pub trait PathTraversal: Send + Sync {
    fn name(&self) -> &str;

    fn capability(&self) -> Capability;

    /// Build the executor for one specification
    fn compile(&self, spec: &PathSpecification) -> PathResult<Arc<dyn PathExecutor>>;
}

/// A runner bound to one specification.
///
/// Executors hold no graph state; they read the store they are given, so one executor
/// can serve concurrent queries.
pub trait PathExecutor: Send + Sync {
    fn specification(&self) -> &PathSpecification;

    fn execute(&self, store: &GraphStore) -> PathResult<Vec<Path>>;
}

/// Search order behind a built-in plugin
pub trait Kernel: Send + Sync + 'static {
    const NAME: &'static str;
    const CAPABILITY: Capability;

    /// Reject specifications the kernel cannot run
    fn check(spec: &PathSpecification) -> PathResult<()>;

    fn run<N: Neighborhood<Edge = Hop>>(
        nb: &N,
        source: NodeId,
        targets: &[NodeId],
        spec: &PathSpecification,
    ) -> Vec<algorithms::PathResult<Hop>>;
}

fn require_targets(spec: &PathSpecification) -> PathResult<()> {
    if spec.targets.is_empty() {
        return Err(PathError::InvalidSpecification(format!(
            "{} needs at least one target",
            spec.algorithm
        )));
    }
    Ok(())
}

/// Unweighted shortest path
pub struct Bfs;

impl Kernel for Bfs {
    const NAME: &'static str = "BFS";
    const CAPABILITY: Capability = Capability::ShortestPath;

    fn check(spec: &PathSpecification) -> PathResult<()> {
        require_targets(spec)
    }

    fn run<N: Neighborhood<Edge = Hop>>(
        nb: &N,
        source: NodeId,
        targets: &[NodeId],
        spec: &PathSpecification,
    ) -> Vec<algorithms::PathResult<Hop>> {
        algorithms::bfs(nb, source, targets, spec.max_depth).into_iter().collect()
    }
}

/// Bidirectional level-synchronous shortest path between two vertices
pub struct Bls;

impl Kernel for Bls {
    const NAME: &'static str = "BLS";
    const CAPABILITY: Capability = Capability::ShortestPath;

    fn check(spec: &PathSpecification) -> PathResult<()> {
        if spec.targets.len() != 1 {
            return Err(PathError::InvalidSpecification(format!(
                "BLS needs exactly one target, got {}",
                spec.targets.len()
            )));
        }
        Ok(())
    }

    fn run<N: Neighborhood<Edge = Hop>>(
        nb: &N,
        source: NodeId,
        targets: &[NodeId],
        spec: &PathSpecification,
    ) -> Vec<algorithms::PathResult<Hop>> {
        match targets.first() {
            Some(&target) => algorithms::bidirectional_bfs(nb, source, target, spec.max_depth)
                .into_iter()
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Cost-weighted shortest path
pub struct Dijkstra;

impl Kernel for Dijkstra {
    const NAME: &'static str = "Dijkstra";
    const CAPABILITY: Capability = Capability::ShortestPath;

    fn check(spec: &PathSpecification) -> PathResult<()> {
        require_targets(spec)
    }

    fn run<N: Neighborhood<Edge = Hop>>(
        nb: &N,
        source: NodeId,
        targets: &[NodeId],
        spec: &PathSpecification,
    ) -> Vec<algorithms::PathResult<Hop>> {
        algorithms::dijkstra(nb, source, targets, spec.max_depth).into_iter().collect()
    }
}

/// Depth-bounded enumeration of simple paths
pub struct AllPaths;

impl Kernel for AllPaths {
    const NAME: &'static str = "AllPaths";
    const CAPABILITY: Capability = Capability::Traversal;

    fn check(spec: &PathSpecification) -> PathResult<()> {
        if spec.max_depth == Some(0) {
            return Err(PathError::InvalidSpecification(
                "AllPaths needs a max depth of at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn run<N: Neighborhood<Edge = Hop>>(
        nb: &N,
        source: NodeId,
        targets: &[NodeId],
        spec: &PathSpecification,
    ) -> Vec<algorithms::PathResult<Hop>> {
        algorithms::all_paths(
            nb,
            source,
            targets,
            spec.max_depth.unwrap_or(DEFAULT_ALL_PATHS_DEPTH),
            spec.max_results.unwrap_or(usize::MAX),
        )
    }
}

/// Plugin wrapper around a [`Kernel`]
pub struct BuiltinPlugin<K: Kernel>(PhantomData<K>);

impl<K: Kernel> BuiltinPlugin<K> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<K: Kernel> Default for BuiltinPlugin<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Kernel> PathTraversal for BuiltinPlugin<K> {
    fn name(&self) -> &str {
        K::NAME
    }

    fn capability(&self) -> Capability {
        K::CAPABILITY
    }

    fn compile(&self, spec: &PathSpecification) -> PathResult<Arc<dyn PathExecutor>> {
        K::check(spec)?;
        Ok(Arc::new(CompiledExecutor::<K> {
            plan: TraversalPlan::compile(spec),
            spec: spec.clone(),
            kernel: PhantomData,
        }))
    }
}

/// Every built-in plugin, in registration order
pub fn builtin_plugins() -> Vec<Arc<dyn PathTraversal>> {
    vec![
        Arc::new(BuiltinPlugin::<Bfs>::new()),
        Arc::new(BuiltinPlugin::<Bls>::new()),
        Arc::new(BuiltinPlugin::<Dijkstra>::new()),
        Arc::new(BuiltinPlugin::<AllPaths>::new()),
    ]
}

struct CompiledExecutor<K: Kernel> {
    spec: PathSpecification,
    plan: TraversalPlan,
    kernel: PhantomData<K>,
}

impl<K: Kernel> CompiledExecutor<K> {
    /// Targets that exist and may be entered; the source always may
    fn reachable_targets(&self, store: &GraphStore) -> PathResult<Vec<NodeId>> {
        let mut targets = Vec::with_capacity(self.spec.targets.len());
        for &target in &self.spec.targets {
            let slot = store
                .get_vertex(target)
                .ok_or(GraphError::VertexNotFound(target))?;
            let admitted = if target == self.spec.source {
                true
            } else {
                let vertex = slot.read().map_err(GraphError::from)?;
                self.plan.accepts_vertex(&vertex)
            };
            if admitted {
                targets.push(target.0);
            }
        }
        Ok(targets)
    }
}

impl<K: Kernel> PathExecutor for CompiledExecutor<K> {
    fn specification(&self) -> &PathSpecification {
        &self.spec
    }

    fn execute(&self, store: &GraphStore) -> PathResult<Vec<Path>> {
        let _gate = store.read_gate();
        let source: VertexId = self.spec.source;
        if !store.contains_vertex(source) {
            return Err(GraphError::VertexNotFound(source).into());
        }
        let targets = self.reachable_targets(store)?;
        if targets.is_empty() && !self.spec.targets.is_empty() {
            return Ok(Vec::new());
        }

        let nb = StoreNeighborhood::new(store, &self.plan, source);
        let results = K::run(&nb, source.0, &targets, &self.spec);
        nb.finish()?;

        let limit = self.spec.max_results.unwrap_or(usize::MAX);
        let paths: Vec<Path> = results.into_iter().take(limit).map(Path::from).collect();
        trace!(spec = %self.spec, paths = paths.len(), "traversal executed");
        Ok(paths)
    }
}
