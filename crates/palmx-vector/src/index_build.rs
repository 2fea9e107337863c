//! Offline index build.
//!
//! Typical flow:
//! 1) Render one text card per catalog entry and embed it (bounded concurrency)
//! 2) Validate every vector; the first failure aborts the whole build
//! 3) Write the artifacts under a fresh build id, then flip `ACTIVE`
use std::path::Path;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use palmx_core::traits::{CardRenderer, Embedder};
use palmx_core::{CatalogEntry, CatalogStore, Error, IndexMetadataEntry, Result};

use crate::artifacts::{self, Manifest};

/// Builds older than the newest few are pruned after a successful publish.
pub const KEEP_BUILDS: usize = 3;

/// Vectors and metadata of a finished build, positionally aligned.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub embedder_id: String,
    pub dimension: usize,
    pub vectors: Vec<Vec<f32>>,
    pub metadata: Vec<IndexMetadataEntry>,
}

pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    renderer: &'a dyn CardRenderer,
    concurrency: usize,
    show_progress: bool,
}

/// Reject vectors the index could not use: wrong size, NaN/inf, or all zero.
pub fn check_vector(vector: &[f32], dim: usize) -> std::result::Result<(), String> {
    if vector.is_empty() {
        return Err("empty embedding".to_string());
    }
    if vector.len() != dim {
        return Err(format!("embedding has dim {} expected {}", vector.len(), dim));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err("embedding contains non-finite values".to_string());
    }
    if vector.iter().all(|x| *x == 0.0) {
        return Err("embedding is all zeros".to_string());
    }
    Ok(())
}

fn card_hash(card: &str) -> String { blake3::hash(card.as_bytes()).to_hex().to_string() }

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder, renderer: &'a dyn CardRenderer) -> Self {
        Self { embedder, renderer, concurrency: 4, show_progress: false }
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn show_progress(mut self, on: bool) -> Self {
        self.show_progress = on;
        self
    }

    async fn embed_entry(&self, entry: &CatalogEntry) -> Result<(Vec<f32>, IndexMetadataEntry)> {
        let card = self.renderer.render(entry);
        let abort = |reason: String| Error::BuildAborted { id: entry.id.clone(), reason };
        let vector = self.embedder.embed(&card).await.map_err(|e| abort(e.to_string()))?;
        check_vector(&vector, self.embedder.dim()).map_err(abort)?;
        let meta = IndexMetadataEntry { id: entry.id.clone(), name: entry.name.clone(), card_hash: card_hash(&card) };
        Ok((vector, meta))
    }

    /// Embed every catalog entry, preserving catalog order. Nothing is written.
    pub async fn build(&self, catalog: &CatalogStore) -> Result<BuiltIndex> {
        if catalog.is_empty() {
            return Err(Error::Catalog("cannot build an index from an empty catalog".to_string()));
        }
        let started = Instant::now();
        info!(entries = catalog.len(), embedder = %self.embedder.embedder_id(), concurrency = self.concurrency, "building embedding index");

        let pb = if self.show_progress { ProgressBar::new(catalog.len() as u64) } else { ProgressBar::hidden() };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let results: Vec<(Vec<f32>, IndexMetadataEntry)> = stream::iter(catalog.iter())
            .map(|entry| {
                let pb = &pb;
                async move {
                    let out = self.embed_entry(entry).await;
                    pb.inc(1);
                    pb.set_message(entry.id.clone());
                    out
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                pb.abandon_with_message("aborted");
                warn!("index build aborted: {}", e);
                e
            })?;
        pb.finish_with_message("done");

        let (vectors, metadata): (Vec<_>, Vec<_>) = results.into_iter().unzip();
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "embedding pass complete");
        Ok(BuiltIndex {
            embedder_id: self.embedder.embedder_id().to_string(),
            dimension: self.embedder.dim(),
            vectors,
            metadata,
        })
    }

    /// Build, write and activate. On any failure the published index is
    /// left exactly as it was.
    pub async fn build_and_publish(&self, catalog: &CatalogStore, index_dir: &Path) -> Result<Manifest> {
        let built = self.build(catalog).await?;
        std::fs::create_dir_all(index_dir)?;
        let manifest = artifacts::write_build(index_dir, &built.embedder_id, &built.vectors, &built.metadata)?;
        artifacts::activate(index_dir, &manifest.build_id)?;
        match artifacts::prune_builds(index_dir, KEEP_BUILDS) {
            Ok(0) => {}
            Ok(n) => debug!(removed = n, "pruned old builds"),
            Err(e) => warn!("pruning old builds failed: {}", e),
        }
        info!(build = %manifest.build_id, count = manifest.count, dim = manifest.dimension, "index published");
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::check_vector;

    #[test]
    fn vector_checks() {
        assert!(check_vector(&[1.0, 0.0], 2).is_ok());
        assert!(check_vector(&[], 2).is_err());
        assert!(check_vector(&[1.0], 2).is_err());
        assert!(check_vector(&[f32::NAN, 1.0], 2).is_err());
        assert!(check_vector(&[0.0, 0.0], 2).is_err());
    }
}
