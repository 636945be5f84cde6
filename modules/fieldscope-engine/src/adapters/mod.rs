// ContentAdapter: replaces inheritance of a BaseConnector with a trait for
// `fetch` plus a separate data record for adapter metadata (AdapterSpec).
// Adapter-specific mapping logic lives alongside, in `mapper.rs`, registered
// by AdapterKind rather than dispatched by name/reflection.

pub mod mapper;
pub mod mock;
pub mod registry;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

/// Where in the phase-barriered plan an adapter runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Structured,
    Enrichment,
}

/// One raw result from a single adapter fetch. Shape is source-specific;
/// the core treats `payload` as opaque JSON.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RawItem {
    pub payload: Value,
}

/// The full result of one `fetch` call.
///
/// `context` carries the adapter's declared `provides` values for the
/// request's dataflow (§4.2) — e.g. a discovery adapter resolving a venue's
/// canonical id that a later enrichment adapter `requires` under
/// `context.*`. Most adapters leave it empty; only adapters that other
/// adapters depend on need to populate it.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RawBatch {
    pub results: Vec<RawItem>,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

/// Closed registry of adapter kinds, standing in for reflection-like
/// dispatch by string name. Each variant has exactly one mapper in
/// `mapper.rs` and, outside tests, one concrete `ContentAdapter` impl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    Serper,
    GooglePlaces,
    OpenStreetMap,
    SportScotland,
    OsBulkRelease,
    DomainRegistry,
}

impl AdapterKind {
    pub fn name(&self) -> &'static str {
        match self {
            AdapterKind::Serper => "serper",
            AdapterKind::GooglePlaces => "google_places",
            AdapterKind::OpenStreetMap => "openstreetmap",
            AdapterKind::SportScotland => "sport_scotland",
            AdapterKind::OsBulkRelease => "os_bulk_release",
            AdapterKind::DomainRegistry => "domain_registry",
        }
    }
}

/// Metadata about an adapter, supplied at planning time — not a method on
/// the adapter trait, since it is static per adapter kind and the planner
/// needs it before any adapter runs.
#[derive(Debug, Clone)]
pub struct AdapterSpec {
    pub kind: AdapterKind,
    pub phase: Phase,
    pub trust_level: i32,
    pub supports_query_only: bool,
    pub estimated_cost_usd: f64,
    pub timeout_seconds: u64,
    pub rate_limit_per_day: i32,
    pub requires: Vec<String>,
    pub provides: Vec<String>,
}

/// Every source adapter's uniform contract: a name and a single fallible
/// async fetch. The orchestrator's wrapping layer (query translation,
/// timeout, mapping) sits outside this trait, in `orchestrator`.
#[async_trait]
pub trait ContentAdapter: Send + Sync {
    fn source_name(&self) -> &str;
    async fn fetch(&self, query: &str) -> anyhow::Result<RawBatch>;
}
