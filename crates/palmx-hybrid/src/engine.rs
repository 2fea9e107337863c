use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use palmx_core::config::{resolve_with_base, AppConfig, RetrievalConfig};
use palmx_core::traits::Embedder;
use palmx_core::types::Candidate;
use palmx_core::{CatalogEntry, CatalogStore, EmbedError, Error, Filters, Result, SourceKind};
use palmx_text::LexicalMatcher;
use palmx_vector::{check_vector, EmbeddingIndex};

use crate::filters;

/// One search result with its provenance.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: Arc<CatalogEntry>,
    pub source: SourceKind,
    /// Rank-derived for vector hits, fuzzy score in `[0, 100]` otherwise.
    pub score: f64,
}

/// Catalog and index that are served together. Swapped as a unit.
struct Corpus {
    catalog: CatalogStore,
    index: EmbeddingIndex,
    /// Lexical keys (ids and names); `owners[i]` is the entry behind `keys[i]`.
    keys: Vec<String>,
    owners: Vec<Arc<CatalogEntry>>,
}

impl Corpus {
    fn new(catalog: CatalogStore, index: EmbeddingIndex) -> Self {
        let mut keys = Vec::with_capacity(catalog.len() * 2);
        let mut owners = Vec::with_capacity(catalog.len() * 2);
        for entry in catalog.iter() {
            keys.push(entry.id.clone());
            owners.push(Arc::clone(entry));
            if !entry.name.trim().is_empty() && entry.name != entry.id {
                keys.push(entry.name.clone());
                owners.push(Arc::clone(entry));
            }
        }
        let stale = (0..index.len())
            .filter_map(|pos| index.metadata(pos))
            .filter(|meta| !catalog.contains(&meta.id))
            .count();
        if stale > 0 {
            warn!(stale, "index references entries missing from the catalog; they will be skipped");
        }
        Self { catalog, index, keys, owners }
    }
}

/// Hybrid retriever over one catalog: semantic neighbours first, fuzzy name
/// matches second, lexical-only fallback whenever embeddings are unusable.
pub struct RetrievalEngine {
    corpus: RwLock<Arc<Corpus>>,
    embedder: Arc<dyn Embedder>,
    matcher: LexicalMatcher,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(catalog: CatalogStore, index: EmbeddingIndex, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            corpus: RwLock::new(Arc::new(Corpus::new(catalog, index))),
            embedder,
            matcher: LexicalMatcher::new(),
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the catalog and the active index named by `app`, resolving
    /// relative paths against `base`. A missing or broken index is not an
    /// error: the engine starts in fallback mode.
    pub fn open(app: &AppConfig, base: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let catalog = CatalogStore::load(&resolve_with_base(base, &app.data.catalog_path))?;
        let index = EmbeddingIndex::open(&resolve_with_base(base, &app.data.index_dir));
        Ok(Self::new(catalog, index, embedder).with_config(app.retrieval.clone()))
    }

    /// Replace catalog and index in one step. Searches already running keep
    /// the pair they started with.
    pub fn reload(&self, catalog: CatalogStore, index: EmbeddingIndex) {
        let corpus = Arc::new(Corpus::new(catalog, index));
        info!(entries = corpus.catalog.len(), index_ready = corpus.index.is_ready(), "corpus reloaded");
        *self.corpus.write() = corpus;
    }

    fn snapshot(&self) -> Arc<Corpus> { self.corpus.read().clone() }

    pub fn is_index_ready(&self) -> bool { self.snapshot().index.is_ready() }
    pub fn catalog_len(&self) -> usize { self.snapshot().catalog.len() }
    pub fn config(&self) -> &RetrievalConfig { &self.config }

    /// Up to `k` entries, best first. Degraded embeddings never surface as
    /// errors; only `k == 0` does.
    pub async fn search(&self, query: &str, k: usize, filters: &Filters) -> Result<Vec<Arc<CatalogEntry>>> {
        Ok(self.search_hits(query, k, filters).await?.into_iter().map(|hit| hit.entry).collect())
    }

    pub async fn search_hits(&self, query: &str, k: usize, filters: &Filters) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidQuery("k must be at least 1".to_string()));
        }
        let corpus = self.snapshot();
        match self.vector_candidates(&corpus, query, k).await {
            Ok(vector) => {
                let lexical = self.lexical_candidates(&corpus, query, k);
                debug!(vector = vector.len(), lexical = lexical.len(), "merging candidates");
                Ok(merge_and_filter(&corpus, vector, lexical, filters, k))
            }
            Err(reason) => {
                info!(%reason, "serving lexical fallback");
                Ok(self.fallback(&corpus, query, k))
            }
        }
    }

    async fn embed_query(&self, query: &str) -> std::result::Result<Vec<f32>, EmbedError> {
        let timeout = self.config.embed_timeout();
        match tokio::time::timeout(timeout, self.embedder.embed(query)).await {
            Ok(result) => result,
            Err(_) => Err(EmbedError::Timeout(timeout)),
        }
    }

    /// Nearest neighbours of the query, over-fetched to leave room for
    /// filter rejection. Any error here means "use the fallback path".
    async fn vector_candidates(&self, corpus: &Corpus, query: &str, k: usize) -> Result<Vec<Candidate>> {
        let Some(dim) = corpus.index.dim() else {
            return Err(Error::IndexNotReady("no embedding index loaded".to_string()));
        };
        if query.trim().is_empty() {
            return Err(Error::EmbeddingUnavailable("blank query is not embedded".to_string()));
        }
        let vector = self.embed_query(query).await?;
        check_vector(&vector, dim).map_err(|reason| Error::from(EmbedError::InvalidVector(reason)))?;

        let neighbors = corpus.index.query(&vector, k.saturating_mul(self.config.overfetch_factor))?;
        let mut out = Vec::with_capacity(neighbors.len());
        for (rank, n) in neighbors.iter().enumerate() {
            match corpus.index.metadata(n.position) {
                Some(meta) if corpus.catalog.contains(&meta.id) => out.push(Candidate {
                    entry_id: meta.id.clone(),
                    relevance: 1.0 / (1.0 + rank as f64),
                    source: SourceKind::Vector,
                }),
                Some(meta) => debug!(id = %meta.id, "skipping indexed entry absent from catalog"),
                None => debug!(position = n.position, "neighbour without metadata"),
            }
        }
        Ok(out)
    }

    /// Best fuzzy match per entry over ids and names, up to `limit` entries.
    fn lexical_candidates(&self, corpus: &Corpus, query: &str, limit: usize) -> Vec<Candidate> {
        let matches = self.matcher.extract(query, &corpus.keys, corpus.keys.len(), self.config.lexical_cutoff);
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for m in matches {
            let entry = &corpus.owners[m.index];
            if !seen.insert(entry.id.as_str()) {
                continue;
            }
            out.push(Candidate { entry_id: entry.id.clone(), relevance: m.score, source: SourceKind::Lexical });
            if out.len() == limit {
                break;
            }
        }
        out
    }

    /// Embedding-free search: substring containment on id or name scores 100,
    /// otherwise the best fuzzy score above the cutoff. Structured filters are
    /// not applied here.
    fn fallback(&self, corpus: &Corpus, query: &str, k: usize) -> Vec<SearchHit> {
        let needle = query.trim().to_lowercase();
        let mut best: HashMap<&str, (f64, &Arc<CatalogEntry>)> = HashMap::new();
        for entry in corpus.catalog.iter() {
            if entry.id.to_lowercase().contains(&needle) || entry.name.to_lowercase().contains(&needle) {
                best.insert(entry.id.as_str(), (100.0, entry));
            }
        }
        for m in self.matcher.extract(query, &corpus.keys, corpus.keys.len(), self.config.lexical_cutoff) {
            let entry = &corpus.owners[m.index];
            let slot = best.entry(entry.id.as_str()).or_insert((m.score, entry));
            if m.score > slot.0 {
                slot.0 = m.score;
            }
        }
        let mut ranked: Vec<(f64, &Arc<CatalogEntry>)> = best.into_values().collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        ranked.truncate(k);
        ranked
            .into_iter()
            .map(|(score, entry)| SearchHit { entry: Arc::clone(entry), source: SourceKind::Fallback, score })
            .collect()
    }
}

/// Vector candidates first, then lexical; the first occurrence of an id
/// wins. Filters run in merge order and the first `k` survivors are kept.
fn merge_and_filter(
    corpus: &Corpus,
    vector: Vec<Candidate>,
    lexical: Vec<Candidate>,
    filters: &Filters,
    k: usize,
) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    vector
        .into_iter()
        .chain(lexical)
        .filter(|c| seen.insert(c.entry_id.clone()))
        .filter_map(|c| corpus.catalog.get(&c.entry_id).map(|entry| (c, entry)))
        .filter(|(_, entry)| filters::matches(entry, filters))
        .take(k)
        .map(|(c, entry)| SearchHit { entry: Arc::clone(entry), source: c.source, score: c.relevance })
        .collect()
}
