// Selects and orders adapters for a request. Lens-driven via
// `connector_rules`; `DefaultPolicy` supplies the lens-absent baseline,
// generalizing the source's hardcoded sports-query heuristic into a
// keyword table any lens can supply.

use std::collections::BTreeMap;

use fieldscope_common::RequestMode;
use fieldscope_lens::LensContract;

use crate::adapters::{AdapterKind, AdapterSpec, Phase};
use crate::query_features::QueryFeatures;
use crate::state::OrchestratorState;

/// One adapter in an execution plan, with dependencies resolved.
#[derive(Debug, Clone)]
pub struct PlannedAdapter {
    pub spec: AdapterSpec,
    /// Names of previously-planned adapters this one's `context.*`
    /// `requires` entries depend on.
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub adapters: Vec<PlannedAdapter>,
}

impl ExecutionPlan {
    pub fn for_phase(&self, phase: Phase) -> Vec<&PlannedAdapter> {
        self.adapters.iter().filter(|a| a.spec.phase == phase).collect()
    }
}

/// The lens-absent baseline: always discover with one general adapter,
/// always enrich with one authoritative adapter, add the free discovery
/// adapter for category searches.
pub struct DefaultPolicy;

impl DefaultPolicy {
    pub fn select_kinds(mode: RequestMode, features: QueryFeatures) -> Vec<AdapterKind> {
        match mode {
            RequestMode::ResolveOne => {
                let mut kinds = vec![AdapterKind::GooglePlaces];
                if features.looks_like_category_search {
                    kinds.push(AdapterKind::Serper);
                }
                kinds
            }
            RequestMode::DiscoverMany => {
                let mut kinds = vec![AdapterKind::Serper];
                if features.looks_like_category_search {
                    kinds.push(AdapterKind::OpenStreetMap);
                }
                kinds.push(AdapterKind::GooglePlaces);
                kinds
            }
        }
    }
}

/// Build an execution plan. `registry` supplies the static `AdapterSpec` for
/// every kind this process knows how to run.
pub fn select(
    query: &str,
    mode: RequestMode,
    features: QueryFeatures,
    lens: &LensContract,
    registry: &BTreeMap<AdapterKind, AdapterSpec>,
) -> ExecutionPlan {
    let mut kinds = DefaultPolicy::select_kinds(mode, features);

    let normalized_query = query.to_lowercase();
    for (adapter_name, rule) in lens.connector_rules() {
        let matches = rule
            .keywords
            .iter()
            .any(|kw| normalized_query.contains(&kw.to_lowercase()));
        if matches {
            if let Some(kind) = registry.keys().find(|k| k.name() == adapter_name) {
                if !kinds.contains(kind) {
                    kinds.push(*kind);
                }
            }
        }
    }

    let mut specs: Vec<AdapterSpec> = kinds
        .into_iter()
        .filter_map(|k| registry.get(&k).cloned())
        .collect();

    // Phase ordering, alphabetical within phase, for determinism.
    specs.sort_by(|a, b| {
        a.phase
            .cmp(&b.phase)
            .then_with(|| a.kind.name().cmp(b.kind.name()))
    });
    specs.dedup_by(|a, b| a.kind == b.kind);

    let planned: Vec<PlannedAdapter> = specs
        .iter()
        .map(|spec| PlannedAdapter {
            spec: spec.clone(),
            depends_on: resolve_dependencies(spec, &specs),
        })
        .collect();

    ExecutionPlan { adapters: planned }
}

/// For every `context.*` item in `requires`, find the provider with the
/// tie-break: higher trust_level wins; equal trust, earlier phase wins;
/// equal phase, lexicographically smaller name wins.
fn resolve_dependencies(spec: &AdapterSpec, all: &[AdapterSpec]) -> Vec<String> {
    let mut deps = Vec::new();
    for requirement in &spec.requires {
        let Some(key) = requirement.strip_prefix("context.") else {
            continue;
        };
        let provides_key = format!("context.{key}");
        let mut candidates: Vec<&AdapterSpec> = all
            .iter()
            .filter(|a| a.kind != spec.kind && a.provides.contains(&provides_key))
            .collect();
        candidates.sort_by(|a, b| {
            b.trust_level
                .cmp(&a.trust_level)
                .then_with(|| a.phase.cmp(&b.phase))
                .then_with(|| a.kind.name().cmp(b.kind.name()))
        });
        if let Some(winner) = candidates.first() {
            let name = winner.kind.name().to_string();
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
    }
    deps
}

/// Aggregate gating: should this adapter actually run given accumulated
/// state? Skip iff every one of: not query-only, no candidates yet, no
/// accepted entities yet, and none of its required context keys are
/// populated.
pub fn should_skip_for_missing_context(spec: &AdapterSpec, state: &OrchestratorState) -> bool {
    let context_requirements: Vec<String> = spec
        .requires
        .iter()
        .filter(|r| r.starts_with("context."))
        .cloned()
        .collect();
    if context_requirements.is_empty() {
        return false;
    }
    !spec.supports_query_only
        && state.candidates.is_empty()
        && state.accepted_entities.is_empty()
        && !state.has_any_context_value(&context_requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscope_lens::LensContract;

    fn registry() -> BTreeMap<AdapterKind, AdapterSpec> {
        let mut r = BTreeMap::new();
        r.insert(
            AdapterKind::Serper,
            AdapterSpec {
                kind: AdapterKind::Serper,
                phase: Phase::Discovery,
                trust_level: 1,
                supports_query_only: true,
                estimated_cost_usd: 0.01,
                timeout_seconds: 10,
                rate_limit_per_day: 1000,
                requires: vec![],
                provides: vec![],
            },
        );
        r.insert(
            AdapterKind::OpenStreetMap,
            AdapterSpec {
                kind: AdapterKind::OpenStreetMap,
                phase: Phase::Discovery,
                trust_level: 2,
                supports_query_only: true,
                estimated_cost_usd: 0.0,
                timeout_seconds: 10,
                rate_limit_per_day: 10000,
                requires: vec![],
                provides: vec![],
            },
        );
        r.insert(
            AdapterKind::GooglePlaces,
            AdapterSpec {
                kind: AdapterKind::GooglePlaces,
                phase: Phase::Enrichment,
                trust_level: 5,
                supports_query_only: true,
                estimated_cost_usd: 0.05,
                timeout_seconds: 10,
                rate_limit_per_day: 500,
                requires: vec![],
                provides: vec![],
            },
        );
        r.insert(
            AdapterKind::SportScotland,
            AdapterSpec {
                kind: AdapterKind::SportScotland,
                phase: Phase::Structured,
                trust_level: 4,
                supports_query_only: false,
                estimated_cost_usd: 0.0,
                timeout_seconds: 10,
                rate_limit_per_day: 1000,
                requires: vec![],
                provides: vec![],
            },
        );
        r
    }

    fn empty_lens() -> LensContract {
        LensContract::from_yaml_str(
            "empty",
            "schema: v1\nfacets: {}\nvalues: []\nmapping_rules: []\n",
            &[],
        )
        .unwrap()
    }

    #[test]
    fn resolve_one_without_category_search_is_google_places_only() {
        let plan = select(
            "oriam scotland",
            RequestMode::ResolveOne,
            QueryFeatures { looks_like_category_search: false, has_geo_intent: false },
            &empty_lens(),
            &registry(),
        );
        assert_eq!(plan.adapters.len(), 1);
        assert_eq!(plan.adapters[0].spec.kind, AdapterKind::GooglePlaces);
    }

    #[test]
    fn discover_many_with_category_search_includes_free_discovery() {
        let plan = select(
            "padel courts",
            RequestMode::DiscoverMany,
            QueryFeatures { looks_like_category_search: true, has_geo_intent: false },
            &empty_lens(),
            &registry(),
        );
        let kinds: Vec<_> = plan.adapters.iter().map(|a| a.spec.kind).collect();
        assert!(kinds.contains(&AdapterKind::Serper));
        assert!(kinds.contains(&AdapterKind::OpenStreetMap));
        assert!(kinds.contains(&AdapterKind::GooglePlaces));
    }

    #[test]
    fn plan_is_phase_ordered_then_alphabetical() {
        let plan = select(
            "padel courts",
            RequestMode::DiscoverMany,
            QueryFeatures { looks_like_category_search: true, has_geo_intent: false },
            &empty_lens(),
            &registry(),
        );
        let phases: Vec<_> = plan.adapters.iter().map(|a| a.spec.phase).collect();
        let mut sorted_phases = phases.clone();
        sorted_phases.sort();
        assert_eq!(phases, sorted_phases);
    }
}
