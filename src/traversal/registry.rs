//! Plugin registry
//!
//! Plugins are registered under unique names. Lookups go through the executor cache, so
//! a specification is compiled once and then served from the cache until it idles out
//! or is evicted.

use super::cache::{CacheStats, ExecutorCache};
use super::path::Path;
use super::plugins::{builtin_plugins, Capability, PathExecutor, PathTraversal};
use super::spec::PathSpecification;
use super::{PathError, PathResult};
use crate::config::CacheConfig;
use crate::graph::GraphStore;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

pub struct PathTraversalRegistry {
    plugins: RwLock<IndexMap<String, Arc<dyn PathTraversal>>>,
    cache: ExecutorCache,
}

impl PathTraversalRegistry {
    /// Empty registry
    pub fn new(cache: ExecutorCache) -> Self {
        Self {
            plugins: RwLock::new(IndexMap::new()),
            cache,
        }
    }

    /// Registry holding the built-in plugins (BFS, BLS, Dijkstra, AllPaths)
    pub fn with_builtins(config: &CacheConfig) -> Self {
        let registry = Self::new(ExecutorCache::from_config(config));
        {
            let mut plugins = registry.plugins.write();
            for plugin in builtin_plugins() {
                plugins.insert(plugin.name().to_string(), plugin);
            }
        }
        registry
    }

    pub fn register(&self, plugin: Arc<dyn PathTraversal>) -> PathResult<()> {
        let name = plugin.name().to_string();
        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            return Err(PathError::DuplicatePlugin(name));
        }
        info!(plugin = %name, capability = ?plugin.capability(), "traversal plugin registered");
        plugins.insert(name, plugin);
        Ok(())
    }

    /// Remove a plugin and every executor compiled by it
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.plugins.write().shift_remove(name).is_some();
        if removed {
            let dropped = self.cache.invalidate_algorithm(name);
            info!(plugin = %name, executors = dropped, "traversal plugin removed");
        }
        removed
    }

    pub fn plugin(&self, name: &str) -> PathResult<Arc<dyn PathTraversal>> {
        self.plugins
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PathError::UnknownAlgorithm(name.to_string()))
    }

    /// Registered names in registration order
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    pub fn capability(&self, name: &str) -> PathResult<Capability> {
        Ok(self.plugin(name)?.capability())
    }

    /// Compiled executor for `spec`, from the cache when possible
    pub fn executor(&self, spec: &PathSpecification) -> PathResult<Arc<dyn PathExecutor>> {
        let plugin = self.plugin(&spec.algorithm)?;
        self.cache.get_or_compile(spec, || plugin.compile(spec))
    }

    /// Run `spec` against `store`
    pub fn execute(&self, store: &GraphStore, spec: &PathSpecification) -> PathResult<Vec<Path>> {
        self.executor(spec)?.execute(store)
    }

    /// Run `spec` under another plugin name
    pub fn execute_with(
        &self,
        algorithm: &str,
        store: &GraphStore,
        spec: &PathSpecification,
    ) -> PathResult<Vec<Path>> {
        if spec.algorithm == algorithm {
            return self.execute(store, spec);
        }
        let mut spec = spec.clone();
        spec.algorithm = algorithm.to_string();
        self.execute(store, &spec)
    }

    pub fn cache(&self) -> &ExecutorCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl Default for PathTraversalRegistry {
    fn default() -> Self {
        Self::with_builtins(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeType, Properties, VertexId};
    use crate::traversal::plugins::{BuiltinPlugin, Bfs};

    #[test]
    fn test_builtins_registered_in_order() {
        let registry = PathTraversalRegistry::default();
        assert_eq!(registry.plugin_names(), vec!["BFS", "BLS", "Dijkstra", "AllPaths"]);
        assert_eq!(registry.capability("AllPaths"), Ok(Capability::Traversal));
        assert_eq!(registry.capability("Dijkstra"), Ok(Capability::ShortestPath));
    }

    #[test]
    fn test_duplicate_and_unknown() {
        let registry = PathTraversalRegistry::default();
        assert_eq!(
            registry.register(Arc::new(BuiltinPlugin::<Bfs>::new())),
            Err(PathError::DuplicatePlugin("BFS".to_string()))
        );
        let spec = PathSpecification::new("A*", VertexId(0)).to(VertexId(1));
        assert!(matches!(
            registry.executor(&spec),
            Err(PathError::UnknownAlgorithm(name)) if name == "A*"
        ));
    }

    #[test]
    fn test_execute_uses_cache() {
        let store = GraphStore::new();
        for _ in 0..3 {
            store.create_vertex(0, None, Properties::new()).unwrap();
        }
        store.create_edge(VertexId(0), EdgeType(0), VertexId(1), 0).unwrap();
        store.create_edge(VertexId(1), EdgeType(0), VertexId(2), 0).unwrap();

        let registry = PathTraversalRegistry::default();
        let spec = PathSpecification::new("BFS", VertexId(0)).to(VertexId(2));
        let first = registry.executor(&spec).unwrap();
        let paths = registry.execute(&store, &spec).unwrap();
        assert!(Arc::ptr_eq(&first, &registry.executor(&spec).unwrap()));
        assert_eq!(paths[0].len(), 2);
        assert_eq!(registry.cache_stats().compilations, 1);

        let bls = registry.execute_with("BLS", &store, &spec).unwrap();
        assert_eq!(bls[0].vertices(), paths[0].vertices());
        assert_eq!(registry.cache_stats().compilations, 2);

        assert!(registry.unregister("BLS"));
        assert_eq!(registry.cache().len(), 1);
        assert!(!registry.unregister("BLS"));
    }
}
