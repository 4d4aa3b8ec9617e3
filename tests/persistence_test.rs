//! Integration tests for snapshots taken through the engine
//!
//! Configured file naming, index and metadata streams, and recovery from damaged files.

use kestrel::graph::{EdgeType, ElementId, Label, Properties, PropertyContainer, PropertyId, VertexId};
use kestrel::persistence::StreamKind;
use kestrel::traversal::PathSpecification;
use kestrel::{EngineConfig, EngineError, GraphEngine, PersistenceCodec, PersistenceError, PropertyValue};
use std::fs;
use std::io::Write;
use tempfile::TempDir;

const NAME: PropertyId = PropertyId(0);

fn populated(config: EngineConfig) -> GraphEngine {
    let engine = GraphEngine::from_config(config).unwrap();
    for name in ["ada", "grace", "edsger"] {
        engine
            .create_vertex(0, Some(Label::new("person")), Properties::from(vec![PropertyContainer::new(NAME, name)]))
            .unwrap();
    }
    engine.create_edge(VertexId(0), EdgeType(0), VertexId(1), 1).unwrap();
    engine.create_edge(VertexId(1), EdgeType(0), VertexId(2), 1).unwrap();

    let indices = engine.store().indices();
    indices.create_index("by_name").unwrap();
    for (id, name) in ["ada", "grace", "edsger"].iter().enumerate() {
        indices
            .add_or_update("by_name", PropertyValue::from(*name), ElementId::Vertex(VertexId(id as u32)))
            .unwrap();
    }
    engine
}

fn yaml_config(dir: &TempDir, yaml: &str) -> EngineConfig {
    let path = dir.path().join("kestrel.yaml");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    EngineConfig::from_yaml_file(&path).unwrap()
}

#[test]
fn test_configured_separator_names_files() {
    let dir = TempDir::new().unwrap();
    let config = yaml_config(&dir, "persistence:\n  buffer_size: 128\n  version_separator: '_'\n");
    assert_eq!(config.persistence.version_separator, '_');

    let engine = populated(config.clone());
    let base = dir.path().join("graph");
    engine.save(&base).unwrap();
    for stream in ["graph-elements", "index", "service-metadata"] {
        assert!(dir.path().join(format!("graph_{}_1", stream)).is_file());
    }

    let restored = GraphEngine::from_config(config).unwrap();
    restored.load(&base).unwrap();
    assert_eq!(restored.store().vertex_count(), 3);

    // A default engine looks for '#'-separated names and finds none
    let other = GraphEngine::new().unwrap();
    let err = other.load(&base).unwrap_err();
    assert!(matches!(err, EngineError::Persistence(PersistenceError::Io(_))));
}

#[test]
fn test_indices_and_metadata_survive() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("nested").join("graph");
    let engine = populated(EngineConfig::default());
    let saved = engine.save(&base).unwrap();
    assert_eq!((saved.vertex_count, saved.edge_count), (3, 2));
    assert_eq!(saved.index_names, vec!["by_name".to_string()]);
    assert!(saved.plugins.iter().any(|plugin| plugin == "Dijkstra"));
    assert!(saved.saved_at().is_some());

    let codec = PersistenceCodec::new(engine.config().persistence.clone());
    assert_eq!(codec.read_metadata(&base).unwrap(), saved);

    let restored = GraphEngine::new().unwrap();
    let loaded = restored.load(&base).unwrap();
    assert_eq!(loaded, saved);
    assert_eq!(
        restored
            .store()
            .indices()
            .lookup("by_name", &PropertyValue::from("grace"))
            .unwrap(),
        vec![ElementId::Vertex(VertexId(1))]
    );
    let paths = restored
        .traverse(&PathSpecification::new("BFS", VertexId(0)).to(VertexId(2)))
        .unwrap();
    assert_eq!(paths[0].vertices(), vec![VertexId(0), VertexId(1), VertexId(2)]);
}

#[test]
fn test_load_discards_later_changes_and_cached_executors() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("graph");
    let engine = populated(EngineConfig::default());
    engine.save(&base).unwrap();

    engine
        .traverse(&PathSpecification::new("BFS", VertexId(0)).to(VertexId(2)))
        .unwrap();
    assert_eq!(engine.registry().cache().len(), 1);
    engine.store().remove_vertex(VertexId(1)).unwrap();
    assert_eq!(engine.store().edge_count(), 0);

    engine.load(&base).unwrap();
    assert!(engine.registry().cache().is_empty());
    assert_eq!(engine.store().vertex_count(), 3);
    assert_eq!(engine.store().edge_count(), 2);
}

#[test]
fn test_damaged_stream_leaves_engine_empty_until_reloaded() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("graph");
    let engine = populated(EngineConfig::default());
    engine.save(&base).unwrap();

    let codec = PersistenceCodec::new(engine.config().persistence.clone());
    let elements = codec.paths(&base).unwrap().get(StreamKind::GraphElements).to_path_buf();
    let pristine = fs::read(&elements).unwrap();
    let mut damaged = pristine.clone();
    let middle = damaged.len() / 2;
    damaged[middle] ^= 0x5a;
    fs::write(&elements, &damaged).unwrap();

    let restored = populated(EngineConfig::default());
    match restored.load(&base).unwrap_err() {
        EngineError::Persistence(err) => assert!(err.is_corruption(), "unexpected error {err}"),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(restored.store().vertex_count(), 0);
    assert!(restored.store().indices().index_names().is_empty());

    fs::write(&elements, &pristine).unwrap();
    restored.load(&base).unwrap();
    assert_eq!(restored.store().vertex_count(), 3);
}

#[test]
fn test_missing_stream_is_reported() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("graph");
    let engine = populated(EngineConfig::default());
    engine.save(&base).unwrap();

    let codec = PersistenceCodec::new(engine.config().persistence.clone());
    fs::remove_file(codec.paths(&base).unwrap().get(StreamKind::Index)).unwrap();
    let err = engine.load(&base).unwrap_err();
    assert!(matches!(err, EngineError::Persistence(PersistenceError::Io(_))));
    assert_eq!(engine.store().vertex_count(), 0);
}
