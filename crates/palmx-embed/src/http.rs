use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use palmx_core::config::EmbeddingConfig;
use palmx_core::traits::Embedder;
use palmx_core::EmbedError;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible embeddings API.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dim: usize,
    id: String,
}

impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.is_some())
            .field("dim", &self.dim)
            .finish()
    }
}

impl HttpEmbedder {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| anyhow!("embedding.endpoint is not set"))?;
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            warn!(env = %config.api_key_env, "no API key found; sending unauthenticated requests");
        }
        let client = reqwest::Client::builder().timeout(Duration::from_millis(config.timeout_ms)).build()?;
        Ok(Self {
            client,
            url: format!("{}/embeddings", endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            dim: config.dimension,
            id: format!("http:{}:d{}", config.model, config.dimension),
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let text = text.replace('\n', " ");
        let body = EmbeddingRequest { input: [text.as_str()], model: &self.model };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| EmbedError::Provider(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbedError::Provider(format!("HTTP {}: {}", status, detail.chars().take(200).collect::<String>())));
        }
        let parsed: EmbeddingResponse = response.json().await.map_err(|e| EmbedError::Provider(e.to_string()))?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::InvalidVector("response contained no embeddings".to_string()))?;
        if vector.len() != self.dim {
            return Err(EmbedError::InvalidVector(format!("dim mismatch: got {} expected {}", vector.len(), self.dim)));
        }
        debug!(dim = vector.len(), "embedding received");
        Ok(vector)
    }
}
