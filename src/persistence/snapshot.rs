//! Whole-store snapshots
//!
//! Save copies the store out under the exclusive gate and writes the graph-elements,
//! index and service-metadata streams, each to a temporary file renamed into place.
//! The service stream goes last so its presence marks a complete snapshot.
//!
//! Load decodes all three streams and cross-checks them before anything is installed.
//! Any failure leaves the store empty.

use super::codec::{read_stream, stream_path, versions_on_disk, write_stream, StreamKind, FORMAT_VERSION};
use super::{PersistenceError, PersistenceResult};
use crate::config::PersistenceConfig;
use crate::graph::{ElementId, GraphImage, GraphStore};
use crate::index::IndexImage;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Service stream payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Crate version that wrote the snapshot
    pub engine_version: String,
    pub format_version: u16,
    /// Unix milliseconds
    pub saved_at_ms: i64,
    pub vertex_count: u64,
    pub edge_count: u64,
    /// Sorted
    pub index_names: Vec<String>,
    /// Traversal plugins registered when the snapshot was taken
    pub plugins: Vec<String>,
}

impl ServiceMetadata {
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.saved_at_ms)
    }
}

/// File locations of one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPaths {
    pub graph_elements: PathBuf,
    pub index: PathBuf,
    pub service_metadata: PathBuf,
}

impl SnapshotPaths {
    pub fn resolve(base: &Path, separator: char) -> PersistenceResult<Self> {
        Ok(Self {
            graph_elements: stream_path(base, StreamKind::GraphElements, separator, FORMAT_VERSION)?,
            index: stream_path(base, StreamKind::Index, separator, FORMAT_VERSION)?,
            service_metadata: stream_path(base, StreamKind::ServiceMetadata, separator, FORMAT_VERSION)?,
        })
    }

    pub fn get(&self, kind: StreamKind) -> &Path {
        match kind {
            StreamKind::GraphElements => &self.graph_elements,
            StreamKind::Index => &self.index,
            StreamKind::ServiceMetadata => &self.service_metadata,
        }
    }

    /// True when every stream file exists
    pub fn exist(&self) -> bool {
        StreamKind::ALL.iter().all(|&kind| self.get(kind).is_file())
    }
}

/// Saves and loads whole-store snapshots
#[derive(Debug, Clone, Default)]
pub struct PersistenceCodec {
    config: PersistenceConfig,
}

impl PersistenceCodec {
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn paths(&self, base: &Path) -> PersistenceResult<SnapshotPaths> {
        SnapshotPaths::resolve(base, self.config.version_separator)
    }

    /// Write a snapshot of `store` next to `base`
    pub fn save(&self, store: &GraphStore, base: &Path, plugins: &[String]) -> PersistenceResult<ServiceMetadata> {
        let paths = self.paths(base)?;
        if let Some(parent) = base.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let exclusive = store.exclusive();
        let image = exclusive.image()?;
        let indices = exclusive.indices().export();
        let metadata = ServiceMetadata {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            format_version: FORMAT_VERSION,
            saved_at_ms: Utc::now().timestamp_millis(),
            vertex_count: image.vertex_count() as u64,
            edge_count: image.edge_count() as u64,
            index_names: indices.iter().map(|index| index.name.clone()).collect(),
            plugins: plugins.to_vec(),
        };

        self.write_file(&paths.graph_elements, StreamKind::GraphElements, &image)?;
        self.write_file(&paths.index, StreamKind::Index, &indices)?;
        self.write_file(&paths.service_metadata, StreamKind::ServiceMetadata, &metadata)?;

        info!(
            path = %base.display(),
            vertices = metadata.vertex_count,
            edges = metadata.edge_count,
            indices = metadata.index_names.len(),
            "snapshot saved"
        );
        Ok(metadata)
    }

    /// Replace the content of `store` with the snapshot at `base`
    pub fn load(&self, store: &GraphStore, base: &Path) -> PersistenceResult<ServiceMetadata> {
        let paths = self.paths(base)?;
        let exclusive = store.exclusive();

        let outcome = self.stage(base, &paths).and_then(|(image, indices, metadata)| {
            exclusive.install(image);
            exclusive
                .indices()
                .install(indices)
                .map_err(|err| PersistenceError::Inconsistent(err.to_string()))?;
            Ok(metadata)
        });

        match outcome {
            Ok(metadata) => {
                info!(
                    path = %base.display(),
                    vertices = exclusive.vertex_count(),
                    edges = exclusive.edge_count(),
                    "snapshot loaded"
                );
                Ok(metadata)
            }
            Err(err) => {
                exclusive.reset();
                warn!(path = %base.display(), error = %err, "snapshot load failed, store reset");
                Err(err)
            }
        }
    }

    /// Read only the service stream of the snapshot at `base`
    pub fn read_metadata(&self, base: &Path) -> PersistenceResult<ServiceMetadata> {
        let paths = self.paths(base)?;
        self.read_file(base, &paths, StreamKind::ServiceMetadata)
    }

    fn stage(
        &self,
        base: &Path,
        paths: &SnapshotPaths,
    ) -> PersistenceResult<(GraphImage, Vec<IndexImage>, ServiceMetadata)> {
        let metadata: ServiceMetadata = self.read_file(base, paths, StreamKind::ServiceMetadata)?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                stream: StreamKind::ServiceMetadata,
                expected: FORMAT_VERSION,
                found: metadata.format_version,
            });
        }
        let image: GraphImage = self.read_file(base, paths, StreamKind::GraphElements)?;
        let indices: Vec<IndexImage> = self.read_file(base, paths, StreamKind::Index)?;
        check_consistency(&metadata, &image, &indices)?;
        Ok((image, indices, metadata))
    }

    fn write_file<T: Serialize>(&self, path: &Path, kind: StreamKind, payload: &T) -> PersistenceResult<()> {
        let mut temporary = path.as_os_str().to_owned();
        temporary.push(".tmp");
        let temporary = PathBuf::from(temporary);

        let result = (|| -> PersistenceResult<u64> {
            let file = File::create(&temporary)?;
            let mut writer = BufWriter::with_capacity(self.config.buffer_size, file);
            let written = write_stream(&mut writer, kind, payload)?;
            let file = writer.into_inner().map_err(|err| err.into_error())?;
            file.sync_all()?;
            fs::rename(&temporary, path)?;
            Ok(written)
        })();

        match result {
            Ok(written) => {
                debug!(stream = %kind, bytes = written, "stream written");
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&temporary);
                Err(err)
            }
        }
    }

    fn read_file<T: DeserializeOwned>(&self, base: &Path, paths: &SnapshotPaths, kind: StreamKind) -> PersistenceResult<T> {
        let file = match File::open(paths.get(kind)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // Written by another format version?
                let versions = versions_on_disk(base, kind, self.config.version_separator)?;
                return match versions.last() {
                    Some(&found) => Err(PersistenceError::VersionMismatch {
                        stream: kind,
                        expected: FORMAT_VERSION,
                        found,
                    }),
                    None => Err(err.into()),
                };
            }
            Err(err) => return Err(err.into()),
        };
        let mut reader = BufReader::with_capacity(self.config.buffer_size, file);
        read_stream(&mut reader, kind)
    }
}

fn check_consistency(metadata: &ServiceMetadata, image: &GraphImage, indices: &[IndexImage]) -> PersistenceResult<()> {
    image
        .validate()
        .map_err(|err| PersistenceError::Inconsistent(err.to_string()))?;

    let counts = (image.vertex_count() as u64, image.edge_count() as u64);
    if counts != (metadata.vertex_count, metadata.edge_count) {
        return Err(PersistenceError::Inconsistent(format!(
            "service metadata records {} vertices and {} edges, graph stream holds {} and {}",
            metadata.vertex_count, metadata.edge_count, counts.0, counts.1
        )));
    }

    let names: Vec<&str> = indices.iter().map(|index| index.name.as_str()).collect();
    if names != metadata.index_names.iter().map(String::as_str).collect::<Vec<_>>() {
        return Err(PersistenceError::Inconsistent(format!(
            "index stream holds {:?}, service metadata records {:?}",
            names, metadata.index_names
        )));
    }

    for index in indices {
        for element in index.elements.iter().flatten() {
            let live = match *element {
                ElementId::Vertex(id) => image.vertices.get(id.as_u32()).is_some(),
                ElementId::Edge(id) => image.edges.get(id.as_u32()).is_some(),
            };
            if !live {
                return Err(PersistenceError::Inconsistent(format!(
                    "index '{}' refers to missing {}",
                    index.name, element
                )));
            }
        }
    }
    Ok(())
}
