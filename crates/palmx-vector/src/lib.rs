//! palmx-vector
//!
//! The embedding side of retrieval: an exact in-memory nearest-neighbour
//! index, its on-disk artifacts, and the offline builder that produces them.

pub mod artifacts;
pub mod index;
pub mod index_build;

pub use artifacts::Manifest;
pub use index::{EmbeddingIndex, Neighbor};
pub use index_build::{check_vector, BuiltIndex, IndexBuilder};
