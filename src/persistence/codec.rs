//! Framed snapshot streams
//!
//! Every stream file holds exactly one frame:
//!
//! ```text
//! marker [4] | format version u16 LE | payload length u64 LE | payload | crc32 u32 LE
//! ```
//!
//! The payload is bincode (fixed-width integers, little endian). It is written straight
//! through the buffered writer while the checksum is computed on the fly, and read back
//! under a size limit equal to the declared length.

use super::{PersistenceError, PersistenceResult};
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Version written into every frame and every file name
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: u64 = 4 + 2 + 8;
const TRAILER_LEN: u64 = 4;

/// The three streams of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    GraphElements,
    Index,
    ServiceMetadata,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [
        StreamKind::GraphElements,
        StreamKind::Index,
        StreamKind::ServiceMetadata,
    ];

    /// Fixed name used in file names
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::GraphElements => "graph-elements",
            StreamKind::Index => "index",
            StreamKind::ServiceMetadata => "service-metadata",
        }
    }

    pub fn marker(self) -> [u8; 4] {
        match self {
            StreamKind::GraphElements => *b"KGEL",
            StreamKind::Index => *b"KGIX",
            StreamKind::ServiceMetadata => *b"KGSM",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

/// `<base file name><sep><stream name><sep><version>` next to `base`
pub fn stream_path(base: &Path, kind: StreamKind, separator: char, version: u16) -> PersistenceResult<PathBuf> {
    let stem = base
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| PersistenceError::InvalidPath(base.to_path_buf()))?;
    Ok(base.with_file_name(format!(
        "{}{}{}{}{}",
        stem,
        separator,
        kind.name(),
        separator,
        version
    )))
}

/// Format versions of `kind` found on disk for `base`, sorted
pub fn versions_on_disk(base: &Path, kind: StreamKind, separator: char) -> PersistenceResult<Vec<u16>> {
    let Some(stem) = base.file_name().and_then(|name| name.to_str()) else {
        return Err(PersistenceError::InvalidPath(base.to_path_buf()));
    };
    let directory = match base.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = format!("{}{}{}{}", stem, separator, kind.name(), separator);

    let mut versions = Vec::new();
    let entries = match std::fs::read_dir(&directory) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(versions),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(version) = name.strip_prefix(&prefix).and_then(|rest| rest.parse().ok()) {
            versions.push(version);
        }
    }
    versions.sort_unstable();
    Ok(versions)
}

struct HashingWriter<W> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct HashingReader<R> {
    inner: R,
    hasher: crc32fast::Hasher,
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.hasher.update(&buf[..read]);
        Ok(read)
    }
}

/// Write one frame; returns the number of bytes written
pub fn write_stream<W: Write, T: Serialize>(writer: &mut W, kind: StreamKind, payload: &T) -> PersistenceResult<u64> {
    let length = options().serialized_size(payload)?;

    writer.write_all(&kind.marker())?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&length.to_le_bytes())?;

    let mut hashing = HashingWriter {
        inner: &mut *writer,
        hasher: crc32fast::Hasher::new(),
    };
    options().serialize_into(&mut hashing, payload)?;
    let checksum = hashing.hasher.finalize();

    writer.write_all(&checksum.to_le_bytes())?;
    Ok(HEADER_LEN + length + TRAILER_LEN)
}

/// Read one frame of `kind` and require the reader to end right after it
pub fn read_stream<R: Read, T: DeserializeOwned>(reader: &mut R, kind: StreamKind) -> PersistenceResult<T> {
    let mut marker = [0u8; 4];
    read_exact(reader, &mut marker, kind)?;
    if marker != kind.marker() {
        return Err(PersistenceError::MarkerMismatch { stream: kind, found: marker });
    }

    let mut version = [0u8; 2];
    read_exact(reader, &mut version, kind)?;
    let version = u16::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(PersistenceError::VersionMismatch {
            stream: kind,
            expected: FORMAT_VERSION,
            found: version,
        });
    }

    let mut length = [0u8; 8];
    read_exact(reader, &mut length, kind)?;
    let length = u64::from_le_bytes(length);

    let mut hashing = HashingReader {
        inner: (&mut *reader).take(length),
        hasher: crc32fast::Hasher::new(),
    };
    let decoded: Result<T, bincode::Error> = options().with_limit(length).deserialize_from(&mut hashing);
    // Hash whatever the decoder left so a damaged payload reports as a checksum failure
    let leftover = io::copy(&mut hashing, &mut io::sink())?;
    if hashing.inner.limit() > 0 {
        return Err(PersistenceError::Truncated(kind));
    }
    let computed = hashing.hasher.finalize();

    let mut stored = [0u8; 4];
    read_exact(reader, &mut stored, kind)?;
    if u32::from_le_bytes(stored) != computed {
        return Err(PersistenceError::ChecksumMismatch(kind));
    }

    let payload = decoded?;
    if leftover > 0 {
        return Err(PersistenceError::Inconsistent(format!(
            "{} payload has {} undecoded bytes",
            kind, leftover
        )));
    }
    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(PersistenceError::Inconsistent(format!("{} stream has trailing data", kind)));
    }
    Ok(payload)
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], kind: StreamKind) -> PersistenceResult<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        io::ErrorKind::UnexpectedEof => PersistenceError::Truncated(kind),
        _ => PersistenceError::Io(err),
    })
}
