// The external report shape (§6), built from `OrchestratorState` plus
// whatever the persistence pass recorded. Serialises directly to the JSON
// object the CLI pretty-prints.

use serde::Serialize;
use serde_json::Value;

use crate::state::{AdapterMetrics, OrchestratorError, OrchestratorState};

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub query: String,
    pub candidates_found: usize,
    pub accepted_entities: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_success: Option<usize>,

    pub connectors: std::collections::BTreeMap<String, AdapterMetrics>,
    pub errors: Vec<OrchestratorError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// Outcome of the optional persistence pass (§4.10), folded into the report
/// when `--persist` was requested. Absent entirely for a dry-run.
#[derive(Debug, Clone, Default)]
pub struct PersistenceOutcome {
    pub persisted_count: usize,
    pub entities_created: usize,
    pub entities_updated: usize,
    pub extraction_total: usize,
    pub extraction_success: usize,
    pub persistence_errors: Vec<String>,
    pub extraction_errors: Vec<String>,
}

pub fn build_report(
    query: &str,
    state: &OrchestratorState,
    persistence: Option<PersistenceOutcome>,
    warnings: Vec<String>,
) -> Report {
    let (persisted_count, entities_created, entities_updated, extraction_total, extraction_success, persistence_errors, extraction_errors) =
        match persistence {
            Some(p) => (
                Some(p.persisted_count),
                Some(p.entities_created),
                Some(p.entities_updated),
                Some(p.extraction_total),
                Some(p.extraction_success),
                if p.persistence_errors.is_empty() { None } else { Some(p.persistence_errors) },
                if p.extraction_errors.is_empty() { None } else { Some(p.extraction_errors) },
            ),
            None => (None, None, None, None, None, None, None),
        };

    Report {
        query: query.to_string(),
        candidates_found: state.candidates.len(),
        accepted_entities: state.accepted_entities.len(),
        persisted_count,
        entities_created,
        entities_updated,
        extraction_total,
        extraction_success,
        connectors: state.metrics.clone(),
        errors: state.errors.clone(),
        persistence_errors,
        extraction_errors,
        warnings: if warnings.is_empty() { None } else { Some(warnings) },
    }
}

pub fn to_json(report: &Report) -> Value {
    serde_json::to_value(report).expect("Report serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_omits_persistence_fields() {
        let state = OrchestratorState::new();
        let report = build_report("padel courts", &state, None, vec![]);
        let value = to_json(&report);
        assert!(value.get("persisted_count").is_none());
        assert!(value.get("warnings").is_none());
    }

    #[test]
    fn persisted_run_includes_counts() {
        let state = OrchestratorState::new();
        let persistence = PersistenceOutcome {
            persisted_count: 3,
            entities_created: 2,
            entities_updated: 1,
            extraction_total: 3,
            extraction_success: 3,
            persistence_errors: vec![],
            extraction_errors: vec![],
        };
        let report = build_report("padel courts", &state, Some(persistence), vec![]);
        let value = to_json(&report);
        assert_eq!(value["persisted_count"], 3);
        assert_eq!(value["entities_created"], 2);
    }
}
