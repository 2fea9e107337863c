//! Domain types shared by the lexical, vector and hybrid engines.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type EntryId = String;

/// One real-estate project in the catalog.
///
/// - `id`: stable primary key, unique across the catalog
/// - `name`: display name
/// - `region`/`area`/`project_type`/`status`: free-text classification, absent when unknown
/// - the remaining fields feed the project card and are never filtered on
/// - `text_card`: pre-rendered card supplied by the catalog source, if any
///
/// Field aliases accept the column names of the buyer knowledge-base export
/// (`project_id`, `city_area`, `starting_price_value`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(alias = "project_id", deserialize_with = "clean::string")]
    pub id: EntryId,
    #[serde(default, alias = "project_name", deserialize_with = "clean::string")]
    pub name: String,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub brand_family: Option<String>,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub region: Option<String>,
    #[serde(default, alias = "city_area", deserialize_with = "clean::opt_string")]
    pub area: Option<String>,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub micro_location: Option<String>,
    #[serde(default, rename = "type", alias = "project_type", deserialize_with = "clean::opt_string")]
    pub project_type: Option<String>,
    #[serde(default, alias = "project_status", deserialize_with = "clean::opt_string")]
    pub status: Option<String>,
    #[serde(default, alias = "current_sales_status", deserialize_with = "clean::opt_string")]
    pub sales_status: Option<String>,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub price_status: Option<String>,
    #[serde(default, alias = "starting_price_value", deserialize_with = "clean::opt_string")]
    pub starting_price: Option<String>,
    #[serde(default, alias = "starting_price_currency", deserialize_with = "clean::opt_string")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub price_range_min: Option<String>,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub price_range_max: Option<String>,
    #[serde(default, alias = "unit_types_offered_json", deserialize_with = "clean::string_list")]
    pub unit_types: Vec<String>,
    #[serde(default, alias = "key_amenities_json", deserialize_with = "clean::string_list")]
    pub amenities: Vec<String>,
    #[serde(default, alias = "zones_json", deserialize_with = "clean::string_list")]
    pub zones: Vec<String>,
    #[serde(default, deserialize_with = "clean::opt_string")]
    pub text_card: Option<String>,
}

impl CatalogEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Self::default() }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self { self.region = Some(region.into()); self }
    pub fn with_area(mut self, area: impl Into<String>) -> Self { self.area = Some(area.into()); self }
    pub fn with_type(mut self, project_type: impl Into<String>) -> Self { self.project_type = Some(project_type.into()); self }
    pub fn with_status(mut self, status: impl Into<String>) -> Self { self.status = Some(status.into()); self }
    pub fn with_text_card(mut self, card: impl Into<String>) -> Self { self.text_card = Some(card.into()); self }
}

/// Structured dimensions a search may be constrained on.
///
/// The set is closed: anything else an orchestrator sends is not a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Region,
    Type,
    Status,
}

impl FilterDimension {
    pub const ALL: [FilterDimension; 3] = [FilterDimension::Region, FilterDimension::Type, FilterDimension::Status];
}

impl fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterDimension::Region => "region",
            FilterDimension::Type => "type",
            FilterDimension::Status => "status",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDimension(pub String);

impl fmt::Display for UnknownDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown filter dimension '{}'", self.0) }
}

impl std::error::Error for UnknownDimension {}

impl FromStr for FilterDimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "region" => Ok(FilterDimension::Region),
            "type" | "project_type" => Ok(FilterDimension::Type),
            "status" | "project_status" => Ok(FilterDimension::Status),
            other => Err(UnknownDimension(other.to_string())),
        }
    }
}

/// Optional per-dimension constraints. An absent (or blank) value means no
/// constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "type", alias = "project_type")]
    pub project_type: Option<String>,
    #[serde(default, alias = "project_status")]
    pub status: Option<String>,
}

impl Filters {
    pub fn none() -> Self { Self::default() }

    pub fn region(mut self, v: impl Into<String>) -> Self { self.region = Some(v.into()); self }
    pub fn project_type(mut self, v: impl Into<String>) -> Self { self.project_type = Some(v.into()); self }
    pub fn status(mut self, v: impl Into<String>) -> Self { self.status = Some(v.into()); self }

    pub fn set(&mut self, dim: FilterDimension, value: impl Into<String>) {
        let value = Some(value.into());
        match dim {
            FilterDimension::Region => self.region = value,
            FilterDimension::Type => self.project_type = value,
            FilterDimension::Status => self.status = value,
        }
    }

    /// The constraint for `dim`, trimmed; `None` when absent or blank.
    pub fn get(&self, dim: FilterDimension) -> Option<&str> {
        let raw = match dim {
            FilterDimension::Region => self.region.as_deref(),
            FilterDimension::Type => self.project_type.as_deref(),
            FilterDimension::Status => self.status.as_deref(),
        };
        raw.map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool { FilterDimension::ALL.iter().all(|d| self.get(*d).is_none()) }

    /// Build filters from loose key/value pairs (e.g. a router's JSON object).
    /// Unknown keys are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut filters = Self::default();
        for (key, value) in pairs {
            match key.as_ref().parse::<FilterDimension>() {
                Ok(dim) => filters.set(dim, value),
                Err(e) => tracing::debug!("ignoring filter: {}", e),
            }
        }
        filters
    }
}

/// Indicates which path produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Lexical,
    Fallback,
}

/// Transient hit produced during one retrieval call.
///
/// `relevance` is source-specific: vector candidates carry a rank-derived
/// placeholder (distances are not comparable with lexical scores), lexical
/// and fallback candidates carry the fuzzy score in `[0, 100]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub entry_id: EntryId,
    pub relevance: f64,
    pub source: SourceKind,
}

/// Position `i` of the vector index <-> the catalog entry embedded there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadataEntry {
    pub id: EntryId,
    #[serde(default)]
    pub name: String,
    /// blake3 of the card text that was embedded.
    #[serde(default)]
    pub card_hash: String,
}

/// Deserializers that normalise knowledge-base values.
///
/// `""`, `unknown`, `null` and `none` all mean "absent"; numbers and booleans
/// are kept as their string form; list columns may arrive as real arrays or
/// as JSON-encoded strings.
pub(crate) mod clean {
    use super::{Deserialize, Deserializer};
    use serde_json::Value;

    const ABSENT: [&str; 4] = ["", "unknown", "null", "none"];

    pub(crate) fn normalize(raw: &str) -> Option<String> {
        let s = raw.trim();
        if ABSENT.iter().any(|a| s.eq_ignore_ascii_case(a)) { None } else { Some(s.to_string()) }
    }

    pub(crate) fn scalar(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => normalize(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub(crate) fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.as_ref().and_then(scalar))
    }

    pub(crate) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(opt_string(d)?.unwrap_or_default())
    }

    fn list_items(v: Value) -> Vec<String> {
        match v {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => map.get("zone_name").or_else(|| map.get("name")).and_then(scalar),
                    other => scalar(&other),
                })
                .collect(),
            Value::String(s) => match serde_json::from_str::<Value>(&s) {
                Ok(parsed @ Value::Array(_)) => list_items(parsed),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    pub(crate) fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.map(list_items).unwrap_or_default())
    }
}
