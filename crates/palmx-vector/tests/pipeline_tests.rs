use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use palmx_core::card::ProjectCardRenderer;
use palmx_core::traits::Embedder;
use palmx_core::{CatalogEntry, CatalogStore, EmbedError, Error};
use palmx_embed::HashEmbedder;
use palmx_vector::artifacts::{self, ACTIVE_FILE};
use palmx_vector::{EmbeddingIndex, IndexBuilder};

fn catalog(n: usize) -> CatalogStore {
    CatalogStore::from_entries((0..n).map(|i| {
        CatalogEntry::new(format!("p{}", i), format!("Project {}", i))
            .with_region(if i % 2 == 0 { "North Coast" } else { "West Cairo" })
            .with_type("residential")
    }))
    .unwrap()
}

/// Embeds normally except for cards mentioning `poison`.
struct FlakyEmbedder {
    inner: HashEmbedder,
    poison: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    fn embedder_id(&self) -> &str { "flaky" }
    fn dim(&self) -> usize { self.inner.dim() }
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains(self.poison) {
            return Err(EmbedError::Provider("upstream 503".to_string()));
        }
        self.inner.embed(text).await
    }
}

#[tokio::test]
async fn build_produces_one_vector_per_entry_in_catalog_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = catalog(12);
    let embedder = HashEmbedder::new(64);
    let renderer = ProjectCardRenderer;

    let manifest = IndexBuilder::new(&embedder, &renderer).concurrency(3).build_and_publish(&store, tmp.path()).await?;
    assert_eq!(manifest.count, 12);
    assert_eq!(manifest.dimension, 64);
    assert_eq!(manifest.embedder_id, "hash:xxh64:d64");

    let index = EmbeddingIndex::try_open(tmp.path())?;
    assert_eq!(index.len(), 12);
    for (pos, entry) in store.iter().enumerate() {
        assert_eq!(index.metadata(pos).unwrap().id, entry.id);
    }

    // A card's own vector is its nearest neighbour.
    let card = palmx_core::traits::CardRenderer::render(&renderer, store.get("p5").unwrap());
    let hits = index.query(&embedder.embed_sync(&card), 1)?;
    assert_eq!(index.metadata(hits[0].position).unwrap().id, "p5");
    Ok(())
}

#[tokio::test]
async fn failed_build_writes_nothing_and_keeps_previous_index() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let renderer = ProjectCardRenderer;
    let good = HashEmbedder::new(32);
    let first = IndexBuilder::new(&good, &renderer).build_and_publish(&catalog(3), tmp.path()).await?;

    let flaky = FlakyEmbedder { inner: HashEmbedder::new(32), poison: "Project 7", calls: AtomicUsize::new(0) };
    let err = IndexBuilder::new(&flaky, &renderer).concurrency(2).build_and_publish(&catalog(20), tmp.path()).await.unwrap_err();
    assert!(matches!(err, Error::BuildAborted { ref id, .. } if id == "p7"), "got {err:?}");
    assert!(flaky.calls.load(Ordering::SeqCst) < 20, "build stops after the first failure");

    assert_eq!(artifacts::active_build_id(tmp.path())?, first.build_id);
    let builds = fs::read_dir(artifacts::builds_dir(tmp.path()))?.count();
    assert_eq!(builds, 1);
    assert_eq!(EmbeddingIndex::try_open(tmp.path())?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn empty_catalog_cannot_be_built() {
    let tmp = tempfile::tempdir().unwrap();
    let embedder = HashEmbedder::new(8);
    let store = CatalogStore::from_entries(Vec::new()).unwrap();
    let err = IndexBuilder::new(&embedder, &ProjectCardRenderer).build_and_publish(&store, tmp.path()).await.unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
    assert!(!tmp.path().join(ACTIVE_FILE).exists());
}

#[tokio::test]
async fn blank_cards_abort_the_build() {
    // The hash embedder maps text without words to the zero vector.
    struct Blank;
    impl palmx_core::traits::CardRenderer for Blank {
        fn render(&self, _: &CatalogEntry) -> String { "  ".to_string() }
    }
    let embedder = HashEmbedder::new(8);
    let err = IndexBuilder::new(&embedder, &Blank).build(&catalog(2)).await.unwrap_err();
    assert!(matches!(err, Error::BuildAborted { ref id, .. } if id == "p0"));
}

#[tokio::test]
async fn tampered_vectors_are_detected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = HashEmbedder::new(16);
    let manifest = IndexBuilder::new(&embedder, &ProjectCardRenderer).build_and_publish(&catalog(4), tmp.path()).await?;

    let path = artifacts::builds_dir(tmp.path()).join(&manifest.build_id).join("vectors.bin");
    let mut bytes = fs::read(&path)?;
    bytes[0] ^= 0xff;
    fs::write(&path, bytes)?;

    assert!(matches!(EmbeddingIndex::try_open(tmp.path()), Err(Error::IndexCorrupt(_))));
    assert!(!EmbeddingIndex::open(tmp.path()).is_ready());
    Ok(())
}

#[test]
fn missing_index_is_not_ready() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(matches!(EmbeddingIndex::try_open(tmp.path()), Err(Error::IndexNotReady(_))));
    assert!(!tmp.path().join(ACTIVE_FILE).exists());
}

#[tokio::test]
async fn old_builds_are_pruned() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = HashEmbedder::new(16);
    let mut last = None;
    for n in 1..=5 {
        last = Some(IndexBuilder::new(&embedder, &ProjectCardRenderer).build_and_publish(&catalog(n), tmp.path()).await?);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let builds = fs::read_dir(artifacts::builds_dir(tmp.path()))?.count();
    assert_eq!(builds, palmx_vector::index_build::KEEP_BUILDS);
    assert_eq!(artifacts::active_build_id(tmp.path())?, last.unwrap().build_id);
    Ok(())
}
