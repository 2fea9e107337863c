use async_trait::async_trait;

use crate::error::EmbedError;
use crate::types::CatalogEntry;

/// External embedding function `embed(text) -> vector`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:xxh64:d256`).
    fn embedder_id(&self) -> &str;
    /// Embedding dimensionality (D).
    fn dim(&self) -> usize;
    /// Embed one text. Implementations should not retry internally; callers
    /// decide what a failure means.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Renders the text card that gets embedded for an entry.
pub trait CardRenderer: Send + Sync {
    fn render(&self, entry: &CatalogEntry) -> String;
}
