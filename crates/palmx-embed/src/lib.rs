//! palmx-embed
//!
//! Embedding providers behind `palmx_core::traits::Embedder`:
//! - `HashEmbedder`: deterministic feature hashing, no model or network needed
//! - `HttpEmbedder`: OpenAI-compatible `/embeddings` endpoint
//!
//! `APP_USE_FAKE_EMBEDDINGS=1` forces the hashing embedder regardless of config.
use anyhow::Result;
use tracing::info;

use palmx_core::config::{EmbeddingConfig, ProviderKind};
use palmx_core::traits::Embedder;

mod hash;
mod http;

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        info!(dim = config.dimension, "using HashEmbedder (APP_USE_FAKE_EMBEDDINGS)");
        return Ok(Box::new(HashEmbedder::new(config.dimension)));
    }
    match config.provider {
        ProviderKind::Hash => Ok(Box::new(HashEmbedder::new(config.dimension))),
        ProviderKind::Http => Ok(Box::new(HttpEmbedder::from_config(config)?)),
    }
}
