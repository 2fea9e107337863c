//! Shared setup for the palmx binaries.
use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use palmx_core::config::{AppConfig, Config};

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Layered config plus the directory relative paths resolve against.
pub fn load_config() -> Result<(AppConfig, PathBuf)> {
    let config = Config::load()?;
    let app = config.app()?;
    Ok((app, std::env::current_dir()?))
}
