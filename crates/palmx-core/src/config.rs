//! Engine configuration.
//!
//! Layers, lowest first: built-in defaults, `config.toml`, `config.<env>.toml`
//! (`RUST_ENV`, default `dev`), then `APP_*` env vars where `__` nests keys,
//! e.g. `APP_RETRIEVAL__LEXICAL_CUTOFF=70`.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// JSON / JSON-lines file, or a directory of them.
    pub catalog_path: String,
    /// Root of the persisted index artifacts.
    pub index_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { catalog_path: "engine-KB/catalog.json".to_string(), index_dir: "runtime/index".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    pub lexical_cutoff: f64,
    pub overfetch_factor: usize,
    pub embed_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_k: 3, lexical_cutoff: 60.0, overfetch_factor: 2, embed_timeout_ms: 5_000 }
    }
}

impl RetrievalConfig {
    pub fn embed_timeout(&self) -> Duration { Duration::from_millis(self.embed_timeout_ms) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Hash,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub dimension: usize,
    /// Base URL of an OpenAI-compatible API; `/embeddings` is appended.
    pub endpoint: Option<String>,
    pub model: String,
    /// Name of the env var holding the API key.
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub build_concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Hash,
            dimension: 256,
            endpoint: None,
            model: "text-embedding-3-small".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_ms: 10_000,
            build_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let r = &self.retrieval;
        if !(0.0..=100.0).contains(&r.lexical_cutoff) {
            anyhow::bail!("retrieval.lexical_cutoff must be within 0..=100, got {}", r.lexical_cutoff);
        }
        if r.overfetch_factor == 0 { anyhow::bail!("retrieval.overfetch_factor must be >= 1"); }
        if r.default_k == 0 { anyhow::bail!("retrieval.default_k must be >= 1"); }
        if r.embed_timeout_ms == 0 { anyhow::bail!("retrieval.embed_timeout_ms must be > 0"); }
        let e = &self.embedding;
        if e.dimension == 0 { anyhow::bail!("embedding.dimension must be > 0"); }
        if e.build_concurrency == 0 { anyhow::bail!("embedding.build_concurrency must be >= 1"); }
        if e.provider == ProviderKind::Http && e.endpoint.as_deref().map_or(true, str::is_empty) {
            anyhow::bail!("embedding.endpoint is required for the http provider");
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.app()?.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml));
        let config = Self { figment };
        config.app()?.validate()?;
        Ok(config)
    }

    pub fn app(&self) -> anyhow::Result<AppConfig> {
        self.figment.extract().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
    }
}

/// `${VAR}`/`$VAR` and a leading `~` expanded; unknown variables are left as
/// written. Not canonicalized.
pub fn expand_path<S: AsRef<str>>(raw: S) -> PathBuf {
    let raw = raw.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}

/// Expanded `path`, joined onto `base` unless already absolute.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, path: S) -> PathBuf {
    let path = expand_path(path);
    if path.is_absolute() { path } else { base.join(path) }
}
