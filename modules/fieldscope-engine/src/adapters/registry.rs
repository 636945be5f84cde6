// The static adapter metadata table consulted at planning time. Costs and
// trust levels are illustrative, matching the named sources used in the
// fixture lenses and golden test scenarios, not pulled from any real
// pricing page.

use std::collections::BTreeMap;

use super::{AdapterKind, AdapterSpec, Phase};

/// Build the default registry of known adapters. A real deployment would
/// likely load per-adapter overrides (cost, rate limit) from config; this
/// table is the static fallback every adapter kind always has an entry for.
pub fn default_registry() -> BTreeMap<AdapterKind, AdapterSpec> {
    let mut registry = BTreeMap::new();

    registry.insert(
        AdapterKind::Serper,
        AdapterSpec {
            kind: AdapterKind::Serper,
            phase: Phase::Discovery,
            trust_level: 1,
            supports_query_only: true,
            estimated_cost_usd: 0.01,
            timeout_seconds: 10,
            rate_limit_per_day: 2000,
            requires: vec![],
            provides: vec![],
        },
    );
    registry.insert(
        AdapterKind::OpenStreetMap,
        AdapterSpec {
            kind: AdapterKind::OpenStreetMap,
            phase: Phase::Discovery,
            trust_level: 2,
            supports_query_only: true,
            estimated_cost_usd: 0.0,
            timeout_seconds: 10,
            rate_limit_per_day: 10_000,
            requires: vec![],
            provides: vec![],
        },
    );
    registry.insert(
        AdapterKind::SportScotland,
        AdapterSpec {
            kind: AdapterKind::SportScotland,
            phase: Phase::Structured,
            trust_level: 4,
            supports_query_only: false,
            estimated_cost_usd: 0.0,
            timeout_seconds: 15,
            rate_limit_per_day: 1000,
            requires: vec![],
            provides: vec!["context.facility_id".to_string()],
        },
    );
    registry.insert(
        AdapterKind::OsBulkRelease,
        AdapterSpec {
            kind: AdapterKind::OsBulkRelease,
            phase: Phase::Structured,
            trust_level: 3,
            supports_query_only: false,
            estimated_cost_usd: 0.0,
            timeout_seconds: 20,
            rate_limit_per_day: 1000,
            requires: vec![],
            provides: vec![],
        },
    );
    registry.insert(
        AdapterKind::DomainRegistry,
        AdapterSpec {
            kind: AdapterKind::DomainRegistry,
            phase: Phase::Enrichment,
            trust_level: 3,
            supports_query_only: false,
            estimated_cost_usd: 0.02,
            timeout_seconds: 10,
            rate_limit_per_day: 500,
            requires: vec!["context.facility_id".to_string()],
            provides: vec![],
        },
    );
    registry.insert(
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

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_adapter_kind_has_an_entry() {
        let registry = default_registry();
        for kind in [
            AdapterKind::Serper,
            AdapterKind::GooglePlaces,
            AdapterKind::OpenStreetMap,
            AdapterKind::SportScotland,
            AdapterKind::OsBulkRelease,
            AdapterKind::DomainRegistry,
        ] {
            assert!(registry.contains_key(&kind), "missing registry entry for {:?}", kind);
        }
    }
}
