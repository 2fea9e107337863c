//! Exact nearest-neighbour index over the catalog embeddings.
//!
//! Vectors live in one row-major buffer; position `i` links to
//! `metadata[i]`, which is the only connection between a vector and its
//! catalog entry. An index is either fully loaded or not ready at all.
use std::path::Path;

use tracing::{info, warn};

use palmx_core::{Error, IndexMetadataEntry, Result};

use crate::artifacts;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    /// Squared Euclidean distance; smaller is closer.
    pub distance: f32,
}

#[derive(Debug)]
struct Loaded {
    dim: usize,
    vectors: Vec<f32>,
    metadata: Vec<IndexMetadataEntry>,
}

#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    loaded: Option<Loaded>,
}

impl EmbeddingIndex {
    pub fn not_ready() -> Self { Self::default() }

    /// Build an index from parallel arrays. Fails with `IndexCorrupt` when the
    /// arrays disagree in length or the vectors in dimensionality.
    pub fn load(vectors: Vec<Vec<f32>>, metadata: Vec<IndexMetadataEntry>) -> Result<Self> {
        if vectors.len() != metadata.len() {
            return Err(Error::IndexCorrupt(format!("{} vectors but {} metadata entries", vectors.len(), metadata.len())));
        }
        let Some(dim) = vectors.first().map(Vec::len) else {
            return Err(Error::IndexCorrupt("index holds no vectors".to_string()));
        };
        if dim == 0 {
            return Err(Error::IndexCorrupt("zero-dimensional vectors".to_string()));
        }
        let mut flat = Vec::with_capacity(dim * vectors.len());
        for (i, v) in vectors.into_iter().enumerate() {
            if v.len() != dim {
                return Err(Error::IndexCorrupt(format!("vector {} has dim {} expected {}", i, v.len(), dim)));
            }
            if v.iter().any(|x| !x.is_finite()) {
                return Err(Error::IndexCorrupt(format!("vector {} contains non-finite values", i)));
            }
            flat.extend(v);
        }
        Ok(Self { loaded: Some(Loaded { dim, vectors: flat, metadata }) })
    }

    /// Load the active artifacts under `index_dir`, or report why not.
    pub fn try_open(index_dir: &Path) -> Result<Self> {
        let stored = artifacts::read_active(index_dir)?;
        if stored.manifest.dimension != stored.vectors.first().map_or(0, Vec::len) {
            return Err(Error::IndexCorrupt("manifest dimension disagrees with vectors".to_string()));
        }
        let index = Self::load(stored.vectors, stored.metadata)?;
        info!(build = %stored.manifest.build_id, vectors = index.len(), dim = stored.manifest.dimension, "embedding index loaded");
        Ok(index)
    }

    /// Like `try_open`, but any failure leaves the index not ready.
    pub fn open(index_dir: &Path) -> Self {
        match Self::try_open(index_dir) {
            Ok(index) => index,
            Err(e) => {
                warn!(dir = %index_dir.display(), "embedding index not ready: {}", e);
                Self::not_ready()
            }
        }
    }

    pub fn is_ready(&self) -> bool { self.loaded.is_some() }
    pub fn dim(&self) -> Option<usize> { self.loaded.as_ref().map(|l| l.dim) }
    pub fn len(&self) -> usize { self.loaded.as_ref().map_or(0, |l| l.metadata.len()) }
    pub fn is_empty(&self) -> bool { self.len() == 0 }
    pub fn metadata(&self, position: usize) -> Option<&IndexMetadataEntry> { self.loaded.as_ref()?.metadata.get(position) }

    /// Up to `k` nearest positions ordered by ascending distance (ties by
    /// position). Pure in-memory scan.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let loaded = self.loaded.as_ref().ok_or_else(|| Error::IndexNotReady("index not loaded".to_string()))?;
        if vector.len() != loaded.dim {
            return Err(Error::EmbeddingUnavailable(format!("query dim {} but index dim {}", vector.len(), loaded.dim)));
        }
        let mut hits: Vec<Neighbor> = loaded
            .vectors
            .chunks_exact(loaded.dim)
            .enumerate()
            .map(|(position, row)| Neighbor { position, distance: squared_l2(row, vector) })
            .collect();
        let by_distance = |a: &Neighbor, b: &Neighbor| a.distance.total_cmp(&b.distance).then(a.position.cmp(&b.position));
        if k < hits.len() {
            hits.select_nth_unstable_by(k, by_distance);
            hits.truncate(k);
        }
        hits.sort_by(by_distance);
        Ok(hits)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum() }

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(id: &str) -> IndexMetadataEntry { IndexMetadataEntry { id: id.to_string(), name: id.to_uppercase(), card_hash: String::new() } }

    #[test]
    fn query_orders_by_distance() {
        let index = EmbeddingIndex::load(
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0], vec![0.1, 0.0]],
            vec![meta("a"), meta("b"), meta("c"), meta("d")],
        )
        .unwrap();
        let hits = index.query(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 3, 1]);
        assert!(hits[0].distance <= hits[1].distance && hits[1].distance <= hits[2].distance);
        assert_eq!(index.metadata(3).map(|m| m.id.as_str()), Some("d"));
    }

    #[test]
    fn query_returns_all_when_k_exceeds_size() {
        let index = EmbeddingIndex::load(vec![vec![1.0], vec![2.0]], vec![meta("a"), meta("b")]).unwrap();
        assert_eq!(index.query(&[0.0], 10).unwrap().len(), 2);
        assert!(index.query(&[0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn equal_distances_tie_break_by_position() {
        let index = EmbeddingIndex::load(vec![vec![1.0], vec![-1.0], vec![1.0]], vec![meta("a"), meta("b"), meta("c")]).unwrap();
        let positions: Vec<usize> = index.query(&[0.0], 2).unwrap().iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn mismatched_arrays_are_corrupt() {
        assert!(matches!(EmbeddingIndex::load(vec![vec![1.0]], vec![]), Err(Error::IndexCorrupt(_))));
        assert!(matches!(
            EmbeddingIndex::load(vec![vec![1.0, 2.0], vec![1.0]], vec![meta("a"), meta("b")]),
            Err(Error::IndexCorrupt(_))
        ));
        assert!(matches!(EmbeddingIndex::load(vec![], vec![]), Err(Error::IndexCorrupt(_))));
    }

    #[test]
    fn not_ready_index_refuses_queries() {
        let index = EmbeddingIndex::not_ready();
        assert!(!index.is_ready());
        assert!(matches!(index.query(&[1.0], 1), Err(Error::IndexNotReady(_))));
    }

    #[test]
    fn query_dimension_must_match() {
        let index = EmbeddingIndex::load(vec![vec![1.0, 0.0]], vec![meta("a")]).unwrap();
        assert!(index.query(&[1.0], 1).is_err());
    }
}
