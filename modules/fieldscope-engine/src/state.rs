use std::collections::{BTreeMap, BTreeSet};

use fieldscope_common::{AcceptedEntity, Candidate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-adapter outcome of one phase execution, the shape the report's
/// `connectors` map is built from directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterMetrics {
    pub executed: bool,
    pub items_received: usize,
    pub candidates_added: usize,
    pub mapping_failures: usize,
    pub execution_time_ms: u64,
    pub cost_usd: f64,
    pub error: Option<String>,
    pub rate_limited: bool,
}

/// One non-fatal error surfaced in the report's top-level `errors` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorError {
    pub connector: String,
    pub error: String,
    pub execution_time_ms: u64,
    pub rate_limited: bool,
}

/// Mutable bookkeeping owned exclusively by the running orchestrator for
/// the duration of one request; never shared, never outlives the request.
/// Extracted Entities and Entities live in the database and outlive it.
#[derive(Debug, Default)]
pub struct OrchestratorState {
    pub candidates: Vec<Candidate>,
    pub accepted_entities: Vec<AcceptedEntity>,
    pub accepted_entity_keys: BTreeSet<String>,
    /// Dataflow values produced by `provides` and consumed by later
    /// adapters' `requires` under `context.*`.
    pub seeds: BTreeMap<String, Value>,
    pub evidence: Vec<Value>,
    pub budget_spent_usd: f64,
    pub confidence: f64,
    pub metrics: BTreeMap<String, AdapterMetrics>,
    pub errors: Vec<OrchestratorError>,
}

impl OrchestratorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_any_context_value(&self, keys: &[String]) -> bool {
        keys.iter().any(|k| {
            k.strip_prefix("context.")
                .map(|rest| self.seeds.contains_key(rest))
                .unwrap_or(false)
        })
    }

    /// External ids a previous adapter seeded for a candidate by normalized
    /// name, consulted by dedup tier 1 when the candidate itself carries no
    /// `ids`. Stored under `seeds["external_ids"][normalized_name]`.
    pub fn seeded_ids_for(&self, normalized_name: &str) -> Option<BTreeMap<String, String>> {
        let ids = self.seeds.get("external_ids")?.get(normalized_name)?.as_object()?;
        Some(
            ids.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect(),
        )
    }
}
