use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Top-level category of an entity. Closed enum, never a bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Place,
    Person,
    Organization,
    Event,
    Thing,
}

impl EntityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Place => "place",
            EntityClass::Person => "person",
            EntityClass::Organization => "organization",
            EntityClass::Event => "event",
            EntityClass::Thing => "thing",
        }
    }
}

impl std::fmt::Display for EntityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four canonical dimensions an entity's mapping rules populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionSource {
    CanonicalActivities,
    CanonicalRoles,
    CanonicalPlaceTypes,
    CanonicalAccess,
}

impl DimensionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionSource::CanonicalActivities => "canonical_activities",
            DimensionSource::CanonicalRoles => "canonical_roles",
            DimensionSource::CanonicalPlaceTypes => "canonical_place_types",
            DimensionSource::CanonicalAccess => "canonical_access",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "canonical_activities" => Some(DimensionSource::CanonicalActivities),
            "canonical_roles" => Some(DimensionSource::CanonicalRoles),
            "canonical_place_types" => Some(DimensionSource::CanonicalPlaceTypes),
            "canonical_access" => Some(DimensionSource::CanonicalAccess),
            _ => None,
        }
    }
}

/// The canonical in-memory form every adapter emits. Short-lived: produced
/// during fetch/mapping, consumed by dedup and persistence, never persisted
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    #[serde(default)]
    pub ids: BTreeMap<String, String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub source: String,
    pub raw: Value,
}

impl Candidate {
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }

    pub fn has_strong_ids(&self) -> bool {
        !self.ids.is_empty()
    }
}

/// A candidate that survived dedup, tracked alongside its dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedEntity {
    pub key: String,
    pub candidate: Candidate,
}

/// Persisted per unique raw payload. One row per `(source, content_hash)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIngestionRecord {
    pub id: Uuid,
    pub source: String,
    pub content_hash: String,
    pub file_path: String,
    pub status: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Per-source result of Phase 1 + Phase 2 on one Raw Ingestion Record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub id: Uuid,
    pub source: String,
    pub entity_class: EntityClass,
    pub attributes: Value,
    pub discovered_attributes: Value,
    pub external_ids: Value,
    pub raw_ingestion_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The merged, deduplicated, cross-source final entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub entity_name: String,
    pub entity_class: EntityClass,
    pub slug: String,
    pub canonical_activities: Vec<String>,
    pub canonical_roles: Vec<String>,
    pub canonical_place_types: Vec<String>,
    pub canonical_access: Vec<String>,
    pub modules: Value,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derive the unique slug for a final Entity: `<source>-<normalised name>`.
///
/// Two adapters can race to produce the same venue under different source
/// prefixes; the merge step must run before the first Entity write for this
/// to converge to one slug (see DESIGN.md).
pub fn slugify(source: &str, name: &str) -> String {
    let normalized: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join("-");
    format!("{}-{}", source.to_lowercase(), collapsed)
}

/// Request mode: resolve a single high-confidence entity, or maximise
/// breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    ResolveOne,
    DiscoverMany,
}

/// One ingestion request as handed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub query: String,
    pub mode: RequestMode,
    pub min_confidence: f64,
    pub target_entity_count: usize,
    pub budget_usd: Option<f64>,
}
