//! Engine facade
//!
//! [`GraphEngine`] bundles a store with its transaction pipeline, traversal registry and
//! snapshot codec, and exposes the operations a front-end needs: direct and batched
//! creation, scans, traversals, save and load.

use crate::config::{ConfigError, EngineConfig};
use crate::graph::{
    EdgeRef, EdgeType, GraphError, GraphStore, Label, Properties, PropertyId, PropertyValue, Timestamp,
    VertexId, VertexRef,
};
use crate::persistence::{PersistenceCodec, PersistenceError, ServiceMetadata};
use crate::scan::{BinaryOperator, GraphScanner, ScanTarget, ScannedElement};
use crate::transaction::{Transaction, TransactionError, TransactionHandle, TransactionPipeline};
use crate::traversal::{Path, PathError, PathSpecification, PathTraversalRegistry};
use std::path::Path as FsPath;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;

pub struct GraphEngine {
    store: Arc<GraphStore>,
    pipeline: TransactionPipeline,
    registry: PathTraversalRegistry,
    codec: PersistenceCodec,
    config: EngineConfig,
}

impl GraphEngine {
    /// Engine with default settings
    pub fn new() -> EngineResult<Self> {
        Self::from_config(EngineConfig::default())
    }

    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let store = Arc::new(GraphStore::new());
        let pipeline = TransactionPipeline::start(Arc::clone(&store))?;
        let registry = PathTraversalRegistry::with_builtins(&config.cache);
        let codec = PersistenceCodec::new(config.persistence.clone());
        info!(
            cache_capacity = config.cache.capacity,
            cache_ttl_secs = config.cache.ttl_secs,
            "graph engine ready"
        );
        Ok(Self {
            store,
            pipeline,
            registry,
            codec,
            config,
        })
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &PathTraversalRegistry {
        &self.registry
    }

    pub fn pipeline(&self) -> &TransactionPipeline {
        &self.pipeline
    }

    pub fn create_vertex(
        &self,
        creation_timestamp: Timestamp,
        label: Option<Label>,
        properties: Properties,
    ) -> EngineResult<VertexRef> {
        Ok(self.store.create_vertex(creation_timestamp, label, properties)?)
    }

    pub fn create_edge(
        &self,
        source: VertexId,
        edge_type: EdgeType,
        target: VertexId,
        creation_timestamp: Timestamp,
    ) -> EngineResult<EdgeRef> {
        Ok(self.store.create_edge(source, edge_type, target, creation_timestamp)?)
    }

    /// Hand a transaction to the pipeline; the handle reports its outcome
    pub fn enqueue(&self, transaction: Transaction) -> EngineResult<TransactionHandle> {
        Ok(self.pipeline.enqueue(transaction)?)
    }

    /// Enqueue and wait for the outcome
    pub fn commit(&self, transaction: Transaction) -> EngineResult<TransactionHandle> {
        let handle = self.pipeline.enqueue(transaction)?;
        handle.wait_until_finished()?;
        Ok(handle)
    }

    /// Scanner over the store using the configured scan settings
    pub fn scanner(&self) -> GraphScanner<'_> {
        GraphScanner::with_config(&self.store, self.config.scan.clone())
    }

    /// Every vertex and edge whose `property_id` satisfies `operator value`
    pub fn graph_scan(
        &self,
        property_id: PropertyId,
        value: PropertyValue,
        operator: BinaryOperator,
    ) -> EngineResult<Vec<ScannedElement>> {
        Ok(self
            .scanner()
            .graph_scan(property_id, value, operator, ScanTarget::All)?)
    }

    /// Run the plugin named in `spec`
    pub fn traverse(&self, spec: &PathSpecification) -> EngineResult<Vec<Path>> {
        Ok(self.registry.execute(&self.store, spec)?)
    }

    /// Run `spec` with the plugin registered as `algorithm`
    pub fn traverse_with(&self, algorithm: &str, spec: &PathSpecification) -> EngineResult<Vec<Path>> {
        Ok(self.registry.execute_with(algorithm, &self.store, spec)?)
    }

    /// Snapshot the store next to `base`
    pub fn save(&self, base: impl AsRef<FsPath>) -> EngineResult<ServiceMetadata> {
        let plugins = self.registry.plugin_names();
        Ok(self.codec.save(&self.store, base.as_ref(), &plugins)?)
    }

    /// Replace the store content with the snapshot at `base`.
    ///
    /// Cached executors are dropped, since they were compiled against the old content.
    pub fn load(&self, base: impl AsRef<FsPath>) -> EngineResult<ServiceMetadata> {
        let loaded = self.codec.load(&self.store, base.as_ref());
        self.registry.cache().clear();
        let metadata = loaded?;

        let registered = self.registry.plugin_names();
        for plugin in metadata.plugins.iter().filter(|name| !registered.contains(name)) {
            warn!(plugin = %plugin, "snapshot was taken with a traversal plugin that is not registered");
        }
        Ok(metadata)
    }

    /// Stop the transaction worker after it drains the queue
    pub fn shutdown(&self) {
        self.pipeline.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PropertyContainer;
    use tempfile::TempDir;

    #[test]
    fn test_direct_and_batched_creation() {
        let engine = GraphEngine::new().unwrap();
        let a = engine.create_vertex(1, None, Properties::new()).unwrap();
        let a = a.read().unwrap().id;

        let mut tx = Transaction::new();
        let b = tx.add_vertex(2, None, Properties::new());
        tx.add_edge(a, EdgeType(0), b, 2);
        let handle = engine.commit(tx).unwrap();
        assert_eq!(handle.created_vertices().unwrap().len(), 1);
        assert_eq!(engine.store().edge_count(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.cache.capacity = 0;
        assert!(matches!(GraphEngine::from_config(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_save_and_load_through_engine() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("engine");
        let engine = GraphEngine::new().unwrap();
        for name in ["x", "y"] {
            let properties = Properties::from(vec![PropertyContainer::new(0u16, name)]);
            engine.create_vertex(1, None, properties).unwrap();
        }
        engine.create_edge(VertexId(0), EdgeType(3), VertexId(1), 1).unwrap();
        let spec = PathSpecification::new("BFS", VertexId(0)).to(VertexId(1));
        assert_eq!(engine.traverse(&spec).unwrap().len(), 1);

        let metadata = engine.save(&base).unwrap();
        assert_eq!(metadata.plugins, vec!["BFS", "BLS", "Dijkstra", "AllPaths"]);

        let restored = GraphEngine::new().unwrap();
        restored.load(&base).unwrap();
        assert_eq!(restored.store().vertex_count(), 2);
        let found = restored
            .graph_scan(PropertyId(0), "y".into(), BinaryOperator::Equals)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(restored.traverse(&spec).unwrap()[0].len(), 1);
    }
}
