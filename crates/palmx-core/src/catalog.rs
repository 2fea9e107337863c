//! In-memory catalog store and its JSON loader.
//!
//! Sources are a JSON array file, a JSON-lines file, or a directory of such
//! files (walked recursively in sorted order). Load order is catalog order.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::{clean, CatalogEntry};

/// Boolean columns merged into the amenity list when truthy.
const AMENITY_FLAGS: [&str; 6] = ["golf", "beach_access", "lagoons", "clubhouse", "pools", "gym"];

/// Immutable id -> entry mapping. A reload builds a new store.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    entries: Vec<Arc<CatalogEntry>>,
    by_id: HashMap<String, usize>,
}

impl CatalogStore {
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Result<Self> {
        let mut store = Self::default();
        for entry in entries {
            if entry.id.is_empty() {
                return Err(Error::Catalog("entry with empty id".to_string()));
            }
            if store.by_id.contains_key(&entry.id) {
                return Err(Error::Catalog(format!("duplicate id '{}'", entry.id)));
            }
            store.by_id.insert(entry.id.clone(), store.entries.len());
            store.entries.push(Arc::new(entry));
        }
        Ok(store)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries = CatalogLoader::default().load(path)?;
        let store = Self::from_entries(entries)?;
        info!(entries = store.len(), path = %path.display(), "catalog loaded");
        Ok(store)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<CatalogEntry>> { self.by_id.get(id).map(|&i| &self.entries[i]) }
    pub fn contains(&self, id: &str) -> bool { self.by_id.contains_key(id) }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Entries in catalog (load) order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CatalogEntry>> { self.entries.iter() }
}

#[derive(Debug, Default)]
pub struct CatalogLoader;

impl CatalogLoader {
    pub fn load(&self, path: &Path) -> Result<Vec<CatalogEntry>> {
        if !path.exists() {
            return Err(Error::Catalog(format!("catalog source not found: {}", path.display())));
        }
        let files = if path.is_dir() { self.list_json_files(path) } else { vec![path.to_path_buf()] };
        let mut entries = Vec::new();
        for file in &files {
            let content = fs::read_to_string(file)?;
            for record in Self::parse_records(&content, file)? {
                if let Some(entry) = Self::to_entry(record, file) {
                    entries.push(entry);
                }
            }
        }
        Ok(entries)
    }

    fn list_json_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches!(e.path().extension().and_then(|s| s.to_str()), Some("json" | "jsonl")))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn parse_records(content: &str, file: &Path) -> Result<Vec<Map<String, Value>>> {
        let trimmed = content.trim_start();
        let values: Vec<Value> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)?
        } else {
            trimmed.lines().filter(|l| !l.trim().is_empty()).map(serde_json::from_str).collect::<std::result::Result<_, _>>()?
        };
        let mut records = Vec::with_capacity(values.len());
        for v in values {
            match v {
                Value::Object(map) => records.push(map),
                other => warn!(file = %file.display(), "skipping non-object record: {}", other),
            }
        }
        Ok(records)
    }

    /// One catalog entry, or `None` (logged) when the record cannot be used.
    fn to_entry(mut record: Map<String, Value>, file: &Path) -> Option<CatalogEntry> {
        let id = ["id", "project_id"]
            .iter()
            .find_map(|k| record.get(*k).and_then(clean::scalar));
        let Some(id) = id else {
            warn!(file = %file.display(), "skipping record without id");
            return None;
        };
        let flags: Vec<String> = AMENITY_FLAGS
            .iter()
            .filter(|flag| record.remove(&format!("{}_flag", flag)).is_some_and(|v| is_truthy(&v)))
            .map(|flag| title_case(flag))
            .collect();
        let mut entry: CatalogEntry = match serde_json::from_value(Value::Object(record)) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(file = %file.display(), %id, "skipping malformed record: {}", e);
                return None;
            }
        };
        if entry.name.is_empty() {
            entry.name = "Unknown".to_string();
        }
        for amenity in flags {
            if !entry.amenities.contains(&amenity) { entry.amenities.push(amenity); }
        }
        Some(entry)
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn title_case(flag: &str) -> String {
    flag.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
