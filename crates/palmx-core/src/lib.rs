//! palmx-core
//!
//! Shared data model for the catalog retrieval engine: catalog entries and
//! their store, structured filters, the error taxonomy, the collaborator
//! traits (`Embedder`, `CardRenderer`) and configuration loading.

pub mod card;
pub mod catalog;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use catalog::CatalogStore;
pub use error::{EmbedError, Error, Result};
pub use types::{CatalogEntry, Filters, FilterDimension, IndexMetadataEntry, SourceKind};
