// Phase-barriered execution loop (§4.6). Within a phase, adapters fetch
// concurrently; the orchestrator itself is single-writer over
// `OrchestratorState` — every result is joined and applied in alphabetical
// adapter-name order, never from inside a spawned task.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fieldscope_common::{Candidate, IngestionRequest, RequestMode};
use fieldscope_store::Store;
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::mapper::map_raw_item;
use crate::adapters::{AdapterKind, AdapterSpec, ContentAdapter, Phase};
use crate::dedup;
use crate::merge::{merge_field, Contribution};
use crate::planner::{self, ExecutionPlan, PlannedAdapter};
use crate::state::{AdapterMetrics, OrchestratorError, OrchestratorState};

/// Outcome of one adapter's wrapped fetch, before it is applied to state.
struct AdapterOutcome {
    metrics: AdapterMetrics,
    candidates: Vec<Candidate>,
    context: BTreeMap<String, Value>,
    error: Option<OrchestratorError>,
}

impl AdapterOutcome {
    fn not_executed(execution_time_ms: u64, error: Option<String>, rate_limited: bool) -> Self {
        Self {
            metrics: AdapterMetrics {
                executed: false,
                execution_time_ms,
                error: error.clone(),
                rate_limited,
                ..Default::default()
            },
            candidates: Vec::new(),
            context: BTreeMap::new(),
            error: None,
        }
    }
}

/// Drives one request's adapters to completion over `adapters`' `Store` for
/// rate-limit bookkeeping. Holds no mutable state itself — every run gets a
/// fresh `OrchestratorState`.
pub struct Orchestrator {
    adapters: BTreeMap<AdapterKind, Arc<dyn ContentAdapter>>,
    store: Store,
}

impl Orchestrator {
    pub fn new(adapters: BTreeMap<AdapterKind, Arc<dyn ContentAdapter>>, store: Store) -> Self {
        Self { adapters, store }
    }

    pub async fn run(&self, request: &IngestionRequest, plan: &ExecutionPlan) -> OrchestratorState {
        let trust_by_source: BTreeMap<String, i32> = plan
            .adapters
            .iter()
            .map(|a| (a.spec.kind.name().to_string(), a.spec.trust_level))
            .collect();

        let mut state = OrchestratorState::new();
        let mut dedup_cursor = 0usize;

        for phase in [Phase::Discovery, Phase::Structured, Phase::Enrichment] {
            let phase_adapters = plan.for_phase(phase);
            if phase_adapters.is_empty() {
                continue;
            }

            if let Some(budget) = request.budget_usd {
                let phase_estimate: f64 = phase_adapters.iter().map(|a| a.spec.estimated_cost_usd).sum();
                if state.budget_spent_usd + phase_estimate > budget {
                    info!(?phase, "budget would be exceeded by this phase, stopping");
                    break;
                }
            }

            let mut runnable: Vec<&PlannedAdapter> = phase_adapters
                .into_iter()
                .filter(|a| !planner::should_skip_for_missing_context(&a.spec, &state))
                .collect();
            runnable.sort_by(|a, b| a.spec.kind.name().cmp(b.spec.kind.name()));

            let outcomes = futures::future::join_all(
                runnable.iter().map(|planned| self.run_one(planned, request, &state)),
            )
            .await;

            self.apply_phase(&runnable, outcomes, &mut state);

            dedup_cursor = self.dedup_new_candidates(&mut state, dedup_cursor);
            state.confidence = compute_confidence(&state, &trust_by_source);

            if self.should_stop_after_phase(request, &state) {
                info!(?phase, "early-stop condition met");
                break;
            }
        }

        dedup_cursor = self.dedup_new_candidates(&mut state, dedup_cursor);
        let _ = dedup_cursor;
        state.confidence = compute_confidence(&state, &trust_by_source);
        state
    }

    /// Run over only the candidates added since `from`, so post-phase
    /// early-stop checks see an up-to-date `accepted_entities` without
    /// re-processing earlier candidates. By the time all phases are done
    /// every candidate has passed through here exactly once, matching the
    /// "dedup runs after all phases complete" framing in letter as well as
    /// spirit (see DESIGN.md).
    fn dedup_new_candidates(&self, state: &mut OrchestratorState, from: usize) -> usize {
        let new_candidates: Vec<Candidate> = state.candidates[from..].to_vec();
        for candidate in new_candidates {
            let _ = dedup::accept(candidate, state);
        }
        state.candidates.len()
    }

    fn should_stop_after_phase(&self, request: &IngestionRequest, state: &OrchestratorState) -> bool {
        if let Some(budget) = request.budget_usd {
            if state.budget_spent_usd >= budget {
                return true;
            }
        }
        match request.mode {
            RequestMode::ResolveOne => {
                state.confidence >= request.min_confidence && !state.accepted_entities.is_empty()
            }
            RequestMode::DiscoverMany => state.accepted_entities.len() >= request.target_entity_count,
        }
    }

    /// Apply one phase's joined outcomes to state, in the (already
    /// alphabetical) order they were run, then merge any `context.*` values
    /// multiple adapters contributed this phase (§4.6.2).
    fn apply_phase(
        &self,
        runnable: &[&PlannedAdapter],
        outcomes: Vec<AdapterOutcome>,
        state: &mut OrchestratorState,
    ) {
        let mut context_contributions: BTreeMap<String, Vec<Contribution>> = BTreeMap::new();

        for (planned, outcome) in runnable.iter().zip(outcomes.into_iter()) {
            let name = planned.spec.kind.name().to_string();

            if outcome.metrics.executed {
                state.budget_spent_usd += outcome.metrics.cost_usd;
            }
            state.candidates.extend(outcome.candidates);
            for (key, value) in outcome.context {
                context_contributions.entry(key).or_default().push(Contribution {
                    adapter_name: name.clone(),
                    trust_level: planned.spec.trust_level,
                    value,
                });
            }
            if let Some(error) = outcome.error {
                state.errors.push(error);
            }
            state.metrics.insert(name, outcome.metrics);
        }

        for (key, contributions) in context_contributions {
            if let Some(merged) = merge_field(&contributions) {
                state.seeds.insert(key, merged);
            }
        }
    }

    /// Wrap one adapter's fetch: rate-limit check, query translation,
    /// timeout, per-item mapping. Never panics and never propagates an
    /// error — every failure mode becomes an `AdapterOutcome`.
    async fn run_one(
        &self,
        planned: &PlannedAdapter,
        request: &IngestionRequest,
        state: &OrchestratorState,
    ) -> AdapterOutcome {
        let spec = &planned.spec;
        let name = spec.kind.name();
        let start = Instant::now();

        match self.store.check_and_increment_usage(name, spec.rate_limit_per_day).await {
            Ok(None) => {
                return AdapterOutcome::not_executed(start.elapsed().as_millis() as u64, None, true);
            }
            Err(e) => {
                let elapsed = start.elapsed().as_millis() as u64;
                let message = e.to_string();
                let mut outcome = AdapterOutcome::not_executed(elapsed, Some(message.clone()), false);
                outcome.error = Some(OrchestratorError {
                    connector: name.to_string(),
                    error: message,
                    execution_time_ms: elapsed,
                    rate_limited: false,
                });
                return outcome;
            }
            Ok(Some(_count)) => {}
        }

        let Some(adapter) = self.adapters.get(&spec.kind) else {
            warn!(adapter = name, "no ContentAdapter registered for planned kind");
            return AdapterOutcome::not_executed(
                start.elapsed().as_millis() as u64,
                Some("adapter not registered".to_string()),
                false,
            );
        };

        let translated_query = translate_query(spec, request, state);

        let fetch_result = tokio::time::timeout(
            Duration::from_secs(spec.timeout_seconds),
            adapter.fetch(&translated_query),
        )
        .await;

        let elapsed = start.elapsed().as_millis() as u64;

        match fetch_result {
            Err(_) => {
                let mut outcome = AdapterOutcome::not_executed(elapsed, Some("timeout".to_string()), false);
                outcome.error = Some(OrchestratorError {
                    connector: name.to_string(),
                    error: "timeout".to_string(),
                    execution_time_ms: elapsed,
                    rate_limited: false,
                });
                outcome
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                let mut outcome = AdapterOutcome::not_executed(elapsed, Some(message.clone()), false);
                outcome.error = Some(OrchestratorError {
                    connector: name.to_string(),
                    error: message,
                    execution_time_ms: elapsed,
                    rate_limited: false,
                });
                outcome
            }
            Ok(Ok(batch)) => {
                let items_received = batch.results.len();
                let mut candidates = Vec::new();
                let mut mapping_failures = 0usize;
                for item in batch.results {
                    match map_raw_item(spec.kind, name, &item) {
                        Some(candidate) => candidates.push(candidate),
                        None => mapping_failures += 1,
                    }
                }
                AdapterOutcome {
                    metrics: AdapterMetrics {
                        executed: true,
                        items_received,
                        candidates_added: candidates.len(),
                        mapping_failures,
                        execution_time_ms: elapsed,
                        cost_usd: spec.estimated_cost_usd,
                        error: None,
                        rate_limited: false,
                    },
                    candidates,
                    context: batch.context,
                    error: None,
                }
            }
        }
    }
}

/// Pass the query through unchanged except for adapters whose `requires`
/// names a `context.*` key this run has seeded — those get it appended so
/// downstream adapters can narrow their search (e.g. a resolved facility id
/// instead of free text).
fn translate_query(spec: &AdapterSpec, request: &IngestionRequest, state: &OrchestratorState) -> String {
    let mut query = request.query.clone();
    for requirement in &spec.requires {
        if let Some(key) = requirement.strip_prefix("context.") {
            if let Some(value) = state.seeds.get(key) {
                if let Some(s) = value.as_str() {
                    query = format!("{query} {s}");
                }
            }
        }
    }
    query
}

/// Confidence has no independent measurement in this engine: it is derived
/// from the highest `trust_level` among sources that contributed an
/// accepted entity, normalized against the highest trust level any adapter
/// in this process can have (5, see `adapters::registry`). See DESIGN.md.
fn compute_confidence(state: &OrchestratorState, trust_by_source: &BTreeMap<String, i32>) -> f64 {
    const MAX_TRUST_LEVEL: f64 = 5.0;
    let best = state
        .accepted_entities
        .iter()
        .filter_map(|a| trust_by_source.get(&a.candidate.source))
        .max()
        .copied()
        .unwrap_or(0);
    (best as f64 / MAX_TRUST_LEVEL).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{FailingAdapter, FixedAdapter, HangingAdapter};
    use crate::adapters::{Phase, RawItem};
    use crate::planner::PlannedAdapter;
    use fieldscope_common::RequestMode;
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;

    fn spec(kind: AdapterKind, phase: Phase, trust_level: i32) -> AdapterSpec {
        AdapterSpec {
            kind,
            phase,
            trust_level,
            supports_query_only: true,
            estimated_cost_usd: 0.0,
            timeout_seconds: 1,
            rate_limit_per_day: 1_000_000,
            requires: vec![],
            provides: vec![],
        }
    }

    fn request() -> IngestionRequest {
        IngestionRequest {
            query: "padel courts".to_string(),
            mode: RequestMode::DiscoverMany,
            min_confidence: 0.0,
            target_entity_count: 100,
            budget_usd: None,
        }
    }

    /// A `Store` that never performs real I/O; connection is deferred by
    /// sqlx until first use, so a pool built with `connect_lazy` is enough
    /// for tests that only exercise adapter fan-out, not persistence.
    fn lazy_store() -> Store {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/fieldscope_test_never_connects")
            .expect("lazy pool construction cannot fail");
        Store::from_pool(pool, "./data")
    }

    #[test]
    fn translate_query_appends_seeded_context_value() {
        let spec = AdapterSpec {
            requires: vec!["context.facility_id".to_string()],
            ..spec(AdapterKind::DomainRegistry, Phase::Enrichment, 3)
        };
        let mut state = OrchestratorState::new();
        state.seeds.insert("facility_id".to_string(), json!("F123"));
        let q = translate_query(&spec, &request(), &state);
        assert_eq!(q, "padel courts F123");
    }

    #[test]
    fn compute_confidence_uses_highest_contributing_trust_level() {
        let mut state = OrchestratorState::new();
        let trust_by_source: BTreeMap<String, i32> =
            [("google_places".to_string(), 5), ("serper".to_string(), 1)].into_iter().collect();
        let candidate = Candidate {
            name: "Oriam".to_string(),
            ids: Default::default(),
            lat: None,
            lng: None,
            address: None,
            source: "google_places".to_string(),
            raw: Value::Null,
        };
        let (_, key, _) = dedup::accept(candidate, &mut state);
        assert!(state.accepted_entity_keys.contains(&key));
        assert_eq!(compute_confidence(&state, &trust_by_source), 1.0);
    }

    #[tokio::test]
    async fn structured_adapter_does_not_start_until_discovery_finished() {
        let d1 = Arc::new(
            FixedAdapter::new(
                "d1",
                vec![RawItem { payload: json!({"title": "Oriam"}) }],
            )
            .with_delay(Duration::from_millis(50)),
        );
        let s1 = Arc::new(FixedAdapter::new("s1", vec![RawItem { payload: json!({"facility_name": "Oriam"}) }]));

        let mut adapters: BTreeMap<AdapterKind, Arc<dyn ContentAdapter>> = BTreeMap::new();
        adapters.insert(AdapterKind::Serper, d1.clone());
        adapters.insert(AdapterKind::SportScotland, s1.clone());

        let orchestrator = Orchestrator::new(adapters, lazy_store());
        let plan = ExecutionPlan {
            adapters: vec![
                PlannedAdapter { spec: spec(AdapterKind::Serper, Phase::Discovery, 1), depends_on: vec![] },
                PlannedAdapter { spec: spec(AdapterKind::SportScotland, Phase::Structured, 4), depends_on: vec![] },
            ],
        };

        let before = Instant::now();
        let state = orchestrator.run(&request(), &plan).await;
        assert!(before.elapsed() >= Duration::from_millis(50));
        assert_eq!(d1.call_count(), 1);
        assert_eq!(s1.call_count(), 1);
        assert!(state.metrics.get("serper").unwrap().executed);
        assert!(state.metrics.get("sport_scotland").unwrap().executed);
    }

    #[tokio::test]
    async fn failing_adapter_is_recorded_non_fatally_others_continue() {
        let good = Arc::new(FixedAdapter::new("good", vec![RawItem { payload: json!({"title": "Oriam"}) }]));
        let bad = Arc::new(FailingAdapter::new("bad"));

        let mut adapters: BTreeMap<AdapterKind, Arc<dyn ContentAdapter>> = BTreeMap::new();
        adapters.insert(AdapterKind::Serper, good.clone());
        adapters.insert(AdapterKind::OpenStreetMap, bad.clone());

        let orchestrator = Orchestrator::new(adapters, lazy_store());
        let plan = ExecutionPlan {
            adapters: vec![
                PlannedAdapter { spec: spec(AdapterKind::Serper, Phase::Discovery, 1), depends_on: vec![] },
                PlannedAdapter { spec: spec(AdapterKind::OpenStreetMap, Phase::Discovery, 2), depends_on: vec![] },
            ],
        };

        let state = orchestrator.run(&request(), &plan).await;
        assert!(state.metrics.get("serper").unwrap().executed);
        assert!(!state.metrics.get("openstreetmap").unwrap().executed);
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.errors[0].connector, "openstreetmap");
        assert!(!state.candidates.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_adapter_is_marked_timeout_not_panic() {
        let hanging = Arc::new(HangingAdapter::new("hangs"));
        let mut adapters: BTreeMap<AdapterKind, Arc<dyn ContentAdapter>> = BTreeMap::new();
        adapters.insert(AdapterKind::Serper, hanging.clone());

        let orchestrator = Orchestrator::new(adapters, lazy_store());
        let plan = ExecutionPlan {
            adapters: vec![PlannedAdapter {
                spec: AdapterSpec { timeout_seconds: 1, ..spec(AdapterKind::Serper, Phase::Discovery, 1) },
                depends_on: vec![],
            }],
        };

        let run = orchestrator.run(&request(), &plan);
        tokio::pin!(run);
        tokio::time::advance(Duration::from_secs(2)).await;
        let state = run.await;
        assert_eq!(state.metrics.get("serper").unwrap().error.as_deref(), Some("timeout"));
        assert!(!state.metrics.get("serper").unwrap().executed);
    }
}
