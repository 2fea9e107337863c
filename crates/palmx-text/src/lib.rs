//! palmx-text
//!
//! Lexical side of retrieval: fuzzy scoring of catalog ids and names against
//! a raw query. Catches direct (possibly misspelled or partial) project name
//! mentions that an embedding model scores poorly. See `fuzz` for scorers.
pub mod fuzz;
pub mod matcher;

pub use matcher::{LexicalMatch, LexicalMatcher};
