use anyhow::{ensure, Context, Result};
use kestrel::graph::{now_timestamp, EdgeType, Label, Properties, PropertyContainer, PropertyId, VertexId};
use kestrel::scan::BinaryOperator;
use kestrel::traversal::PathSpecification;
use kestrel::{EngineConfig, GraphEngine, Transaction};
use std::path::Path;

const NAME: PropertyId = PropertyId(0);

const COMMUNICATES_WITH: EdgeType = EdgeType(0);
const TRUSTS: EdgeType = EdgeType(1);
const ATTACKS: EdgeType = EdgeType(2);

const PEOPLE: [&str; 5] = ["Alice", "Bob", "Eve", "Mallory", "Trent"];

fn main() -> Result<()> {
    kestrel::logging::init();

    println!("Kestrel Graph Engine v{}", kestrel::version());
    println!("==========================================");
    println!();

    let config_path = std::env::args().nth(1);
    let config = EngineConfig::load(config_path.as_deref().map(Path::new)).context("loading configuration")?;
    let engine = GraphEngine::from_config(config)?;

    let people = build_graph(&engine)?;
    scan_graph(&engine)?;
    traverse_graph(&engine, &people)?;
    round_trip(&engine)?;

    engine.shutdown();
    Ok(())
}

/// Creates the five people and their relations in one transaction
fn build_graph(engine: &GraphEngine) -> Result<Vec<VertexId>> {
    println!("=== Demo 1: Batched creation ===");
    let timestamp = now_timestamp();
    let mut tx = Transaction::new();
    let endpoints: Vec<_> = PEOPLE
        .iter()
        .map(|&name| {
            let properties = Properties::from(vec![PropertyContainer::new(NAME, name)]);
            tx.add_vertex(timestamp, Some(Label::new("person")), properties)
        })
        .collect();
    let [alice, bob, eve, mallory, trent] = [0, 1, 2, 3, 4].map(|i| endpoints[i]);

    tx.add_edge(alice, COMMUNICATES_WITH, bob, timestamp)
        .add_edge(alice, TRUSTS, trent, timestamp)
        .add_edge(bob, TRUSTS, trent, timestamp)
        .add_edge(eve, ATTACKS, alice, timestamp)
        .add_edge(mallory, ATTACKS, alice, timestamp)
        .add_edge(mallory, ATTACKS, bob, timestamp);

    let handle = engine.enqueue(tx)?;
    handle.wait_until_finished()?;

    let mut ids = Vec::with_capacity(PEOPLE.len());
    for vertex in handle.created_vertices()? {
        ids.push(vertex.read()?.id);
    }
    println!(
        "✓ Transaction {} committed: {} vertices, {} edges",
        handle.id(),
        engine.store().vertex_count(),
        engine.store().edge_count()
    );
    ensure!(engine.store().vertex_count() == 5, "expected 5 vertices");
    ensure!(engine.store().edge_count() == 6, "expected 6 edges");
    Ok(ids)
}

fn scan_graph(engine: &GraphEngine) -> Result<()> {
    println!("\n=== Demo 2: Property scan ===");
    let found = engine.graph_scan(NAME, "Alice".into(), BinaryOperator::Equals)?;
    for element in &found {
        println!("✓ name == \"Alice\" matched {}", element.element_id()?);
    }
    ensure!(found.len() == 1, "expected exactly one Alice, found {}", found.len());

    let later = engine.graph_scan(NAME, "M".into(), BinaryOperator::Greater)?;
    println!("✓ {} people sort after \"M\"", later.len());
    Ok(())
}

fn traverse_graph(engine: &GraphEngine, people: &[VertexId]) -> Result<()> {
    println!("\n=== Demo 3: Path traversal ===");
    let (eve, mallory, trent) = (people[2], people[3], people[4]);

    let shortest = PathSpecification::new("BFS", eve).to(trent);
    let paths = engine.traverse(&shortest)?;
    println!("✓ {}", shortest);
    println!("{}", serde_json::to_string_pretty(&paths)?);

    let all = PathSpecification::new("AllPaths", mallory).to(trent);
    let paths = engine.traverse(&all)?;
    println!("✓ {} found {} paths", all, paths.len());
    for path in &paths {
        println!("  {:?}", path.vertices());
    }

    // Same specification again is served from the executor cache
    engine.traverse(&shortest)?;
    let stats = engine.registry().cache_stats();
    println!(
        "✓ Executor cache: {} hits, {} misses, {} compiled ({:.1}% hit rate)",
        stats.hits,
        stats.misses,
        stats.compilations,
        stats.hit_rate()
    );
    Ok(())
}

fn round_trip(engine: &GraphEngine) -> Result<()> {
    println!("\n=== Demo 4: Snapshot ===");
    let directory = std::env::temp_dir().join(format!("kestrel-demo-{}", std::process::id()));
    let base = directory.join("graph");

    let saved = engine.save(&base)?;
    println!(
        "✓ Saved {} vertices and {} edges to {}",
        saved.vertex_count,
        saved.edge_count,
        directory.display()
    );

    let restored = GraphEngine::from_config(engine.config().clone())?;
    let loaded = restored.load(&base)?;
    println!(
        "✓ Loaded snapshot written by v{} at {}",
        loaded.engine_version,
        loaded
            .saved_at()
            .map_or_else(|| "unknown time".to_string(), |at| at.to_rfc3339())
    );
    ensure!(
        restored.store().vertex_count() == engine.store().vertex_count()
            && restored.store().edge_count() == engine.store().edge_count(),
        "restored store differs from the saved one"
    );

    let _ = std::fs::remove_dir_all(&directory);
    restored.shutdown();
    Ok(())
}
