//! On-disk layout of a published embedding index.
//!
//! ```text
//! <index_dir>/
//!   ACTIVE                      build id currently served
//!   builds/<build_id>/
//!     vectors.bin               little-endian f32, row-major
//!     metadata.json             [IndexMetadataEntry], same order as rows
//!     manifest.json             Manifest
//! ```
//!
//! A build directory is assembled under a temporary name and renamed into
//! place; `ACTIVE` is swapped with a rename as well, so readers only ever see
//! a complete build or the previous one.
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use palmx_core::{Error, IndexMetadataEntry, Result};

pub const FORMAT_VERSION: u32 = 1;
pub const ACTIVE_FILE: &str = "ACTIVE";
pub const BUILDS_DIR: &str = "builds";
const VECTORS_FILE: &str = "vectors.bin";
const METADATA_FILE: &str = "metadata.json";
const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub build_id: String,
    pub embedder_id: String,
    pub dimension: usize,
    pub count: usize,
    pub vectors_blake3: String,
    pub created_at: DateTime<Utc>,
}

/// Everything read back from one build directory.
#[derive(Debug)]
pub struct StoredIndex {
    pub manifest: Manifest,
    pub vectors: Vec<Vec<f32>>,
    pub metadata: Vec<IndexMetadataEntry>,
}

fn encode_vectors(vectors: &[Vec<f32>]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vectors.iter().map(|v| v.len() * 4).sum());
    for x in vectors.iter().flatten() {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

fn decode_vectors(bytes: &[u8], dimension: usize, count: usize) -> Result<Vec<Vec<f32>>> {
    let expected = dimension.checked_mul(count).and_then(|n| n.checked_mul(4));
    if dimension == 0 || expected != Some(bytes.len()) {
        return Err(Error::IndexCorrupt(format!(
            "{} holds {} bytes, expected {} vectors of dim {}",
            VECTORS_FILE,
            bytes.len(),
            count,
            dimension
        )));
    }
    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(floats.chunks_exact(dimension).map(<[f32]>::to_vec).collect())
}

pub fn builds_dir(index_dir: &Path) -> PathBuf { index_dir.join(BUILDS_DIR) }

/// Write a complete build and return its manifest. Does not touch `ACTIVE`.
pub fn write_build(
    index_dir: &Path,
    embedder_id: &str,
    vectors: &[Vec<f32>],
    metadata: &[IndexMetadataEntry],
) -> Result<Manifest> {
    if vectors.len() != metadata.len() {
        return Err(Error::IndexCorrupt(format!("{} vectors but {} metadata entries", vectors.len(), metadata.len())));
    }
    let dimension = vectors.first().map_or(0, Vec::len);
    let bytes = encode_vectors(vectors);
    let checksum = blake3::hash(&bytes).to_hex().to_string();
    let created_at = Utc::now();
    let build_id = format!("{}-{}", created_at.format("%Y%m%dT%H%M%S%3fZ"), &checksum[..8]);
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        build_id: build_id.clone(),
        embedder_id: embedder_id.to_string(),
        dimension,
        count: vectors.len(),
        vectors_blake3: checksum,
        created_at,
    };

    let builds = builds_dir(index_dir);
    fs::create_dir_all(&builds)?;
    let staging = tempfile::Builder::new().prefix(".staging-").tempdir_in(&builds)?;
    fs::write(staging.path().join(VECTORS_FILE), &bytes)?;
    fs::write(staging.path().join(METADATA_FILE), serde_json::to_vec_pretty(metadata)?)?;
    fs::write(staging.path().join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)?;

    let target = builds.join(&build_id);
    // On success the staging guard finds nothing left to clean up.
    fs::rename(staging.path(), &target)?;
    debug!(build = %build_id, path = %target.display(), "build written");
    Ok(manifest)
}

/// Point `ACTIVE` at `build_id`. The swap is a rename, never a partial write.
pub fn activate(index_dir: &Path, build_id: &str) -> Result<()> {
    if !builds_dir(index_dir).join(build_id).join(MANIFEST_FILE).is_file() {
        return Err(Error::IndexNotReady(format!("build {} does not exist", build_id)));
    }
    let mut tmp = NamedTempFile::new_in(index_dir)?;
    writeln!(tmp, "{}", build_id)?;
    tmp.as_file().sync_all()?;
    tmp.persist(index_dir.join(ACTIVE_FILE)).map_err(|e| Error::Io(e.error))?;
    info!(build = %build_id, "active index switched");
    Ok(())
}

pub fn active_build_id(index_dir: &Path) -> Result<String> {
    match fs::read_to_string(index_dir.join(ACTIVE_FILE)) {
        Ok(s) => {
            let id = s.trim();
            if id.is_empty() {
                return Err(Error::IndexCorrupt(format!("{} is empty", ACTIVE_FILE)));
            }
            Ok(id.to_string())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(Error::IndexNotReady(format!("no index published under {}", index_dir.display())))
        }
        Err(e) => Err(e.into()),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::IndexCorrupt(format!("missing {}", path.display())),
        _ => Error::Io(e),
    })
}

/// Read and verify one build directory.
pub fn read_build(index_dir: &Path, build_id: &str) -> Result<StoredIndex> {
    let dir = builds_dir(index_dir).join(build_id);
    if !dir.is_dir() {
        return Err(Error::IndexNotReady(format!("build {} not found", build_id)));
    }
    let manifest: Manifest = serde_json::from_slice(&read_file(&dir.join(MANIFEST_FILE))?)
        .map_err(|e| Error::IndexCorrupt(format!("{}: {}", MANIFEST_FILE, e)))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::IndexCorrupt(format!("unsupported format version {}", manifest.format_version)));
    }
    let bytes = read_file(&dir.join(VECTORS_FILE))?;
    let checksum = blake3::hash(&bytes).to_hex().to_string();
    if checksum != manifest.vectors_blake3 {
        return Err(Error::IndexCorrupt(format!("{} checksum mismatch", VECTORS_FILE)));
    }
    let vectors = decode_vectors(&bytes, manifest.dimension, manifest.count)?;
    let metadata: Vec<IndexMetadataEntry> = serde_json::from_slice(&read_file(&dir.join(METADATA_FILE))?)
        .map_err(|e| Error::IndexCorrupt(format!("{}: {}", METADATA_FILE, e)))?;
    if metadata.len() != manifest.count {
        return Err(Error::IndexCorrupt(format!("{} metadata entries, manifest says {}", metadata.len(), manifest.count)));
    }
    Ok(StoredIndex { manifest, vectors, metadata })
}

pub fn read_active(index_dir: &Path) -> Result<StoredIndex> {
    let build_id = active_build_id(index_dir)?;
    read_build(index_dir, &build_id)
}

/// Delete all but the newest `keep` builds; the active one is never removed.
pub fn prune_builds(index_dir: &Path, keep: usize) -> Result<usize> {
    let builds = builds_dir(index_dir);
    if !builds.is_dir() {
        return Ok(0);
    }
    let active = active_build_id(index_dir).ok();
    let mut ids: Vec<String> = fs::read_dir(&builds)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    // Build ids start with a UTC timestamp, so lexical order is age order.
    ids.sort_unstable_by(|a, b| b.cmp(a));
    let mut removed = 0;
    for id in ids.into_iter().skip(keep) {
        if active.as_deref() == Some(id.as_str()) {
            continue;
        }
        match fs::remove_dir_all(builds.join(&id)) {
            Ok(()) => removed += 1,
            Err(e) => warn!(build = %id, "failed to prune build: {}", e),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> IndexMetadataEntry { IndexMetadataEntry { id: id.to_string(), name: id.to_string(), card_hash: "h".to_string() } }

    #[test]
    fn write_activate_read() {
        let tmp = tempfile::tempdir().unwrap();
        let vectors = vec![vec![1.0, 2.0], vec![3.0, -4.5]];
        let manifest = write_build(tmp.path(), "test", &vectors, &[meta("a"), meta("b")]).unwrap();
        assert!(matches!(read_active(tmp.path()), Err(Error::IndexNotReady(_))));

        activate(tmp.path(), &manifest.build_id).unwrap();
        let stored = read_active(tmp.path()).unwrap();
        assert_eq!(stored.manifest, manifest);
        assert_eq!(stored.vectors, vectors);
        assert_eq!(stored.metadata[1].id, "b");
    }

    #[test]
    fn activating_unknown_build_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(activate(tmp.path(), "nope").is_err());
        assert!(!tmp.path().join(ACTIVE_FILE).exists());
    }

    #[test]
    fn truncated_vectors_are_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = write_build(tmp.path(), "test", &[vec![1.0, 2.0]], &[meta("a")]).unwrap();
        let path = builds_dir(tmp.path()).join(&manifest.build_id).join(VECTORS_FILE);
        fs::write(&path, [0u8; 4]).unwrap();
        assert!(matches!(read_build(tmp.path(), &manifest.build_id), Err(Error::IndexCorrupt(_))));
    }

    #[test]
    fn oversized_manifest_dimension_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = write_build(tmp.path(), "test", &[vec![1.0, 2.0]], &[meta("a")]).unwrap();
        manifest.dimension = usize::MAX / 2;
        let path = builds_dir(tmp.path()).join(&manifest.build_id).join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_vec_pretty(&manifest).unwrap()).unwrap();
        assert!(matches!(read_build(tmp.path(), &manifest.build_id), Err(Error::IndexCorrupt(_))));
    }
}
