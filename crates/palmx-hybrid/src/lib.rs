//! palmx-hybrid
//!
//! The public search contract: `RetrievalEngine::search(query, k, filters)`.
//! Embedding neighbours and fuzzy name matches are merged (vector first, first
//! occurrence wins), filtered and truncated to `k`. When the index is missing
//! or the embedding call fails, a lexical-only fallback answers instead.

mod engine;
pub mod filters;

pub use engine::{RetrievalEngine, SearchHit};
