// Persistence & finalization (§4.10): raw ingestion upsert, Phase 1 + Phase 2
// extraction, classification, Extracted Entity insert, then one Entity
// upsert per accepted candidate.
//
// Dedup's `accept` (§4.5) already resolves each merge key to a single
// surviving Candidate — on a fuzzy match it replaces the weaker record
// outright rather than keeping both around for a later field-by-field
// merge. Finalization here therefore builds one Entity per accepted
// candidate directly; the §4.6.2 scalar/list/dict merge rules in
// `merge.rs` are exercised where multiple sources really do contribute
// concurrently to the same state — merging adapters' `context.*` values
// within a phase (see `orchestrator.rs`) — not a second time here. See
// DESIGN.md.

use fieldscope_common::{content_hash, slugify, AcceptedEntity, DimensionSource};
use fieldscope_store::entity::{UpsertEntity, UpsertOutcome};
use fieldscope_store::extracted_entity::InsertExtractedEntity;
use fieldscope_store::Store;
use serde_json::{json, Map, Value};

use crate::apply::apply_lens;
use crate::classify;
use crate::context::ExecutionContext;
use crate::extract::{run_phase1, LlmExtractor};
use crate::report::PersistenceOutcome;
use crate::state::OrchestratorState;

fn union_sorted(a: &[String], b: Option<&Vec<String>>) -> Vec<String> {
    let mut combined: Vec<String> = a.to_vec();
    if let Some(extra) = b {
        combined.extend(extra.iter().cloned());
    }
    combined.sort();
    combined.dedup();
    combined
}

fn dimension(dimensions: &std::collections::BTreeMap<DimensionSource, Vec<String>>, source: DimensionSource) -> Option<&Vec<String>> {
    dimensions.get(&source)
}

async fn persist_one(
    store: &Store,
    ctx: &ExecutionContext,
    accepted: &AcceptedEntity,
    llm: &dyn LlmExtractor,
    outcome: &mut PersistenceOutcome,
) {
    let candidate = &accepted.candidate;
    let hash = content_hash(&candidate.raw);
    let metadata = json!({"candidate_name": candidate.name, "dedup_key": accepted.key});

    let raw_row = match store.upsert_raw_ingestion(&candidate.source, &hash, &candidate.raw, &metadata).await {
        Ok(row) => row,
        Err(e) => {
            outcome.persistence_errors.push(format!("{}: raw ingestion upsert failed: {e}", candidate.source));
            return;
        }
    };

    outcome.extraction_total += 1;
    let phase1 = match run_phase1(candidate, llm).await {
        Ok(p) => p,
        Err(e) => {
            outcome.extraction_errors.push(format!("{}: {e}", candidate.source));
            return;
        }
    };
    let primitives = phase1.schema_attrs;

    let entity_class = classify::resolve_entity_class(&primitives);
    let classification = classify::resolve(&primitives);
    let applied = apply_lens(&ctx.lens_contract, &primitives, &candidate.source, entity_class);

    let canonical_activities = union_sorted(
        &classification.canonical_activities,
        dimension(&applied.dimensions, DimensionSource::CanonicalActivities),
    );
    let canonical_place_types = union_sorted(
        &classification.canonical_place_types,
        dimension(&applied.dimensions, DimensionSource::CanonicalPlaceTypes),
    );
    let canonical_roles = union_sorted(
        &classification.canonical_roles,
        dimension(&applied.dimensions, DimensionSource::CanonicalRoles),
    );
    let canonical_access = union_sorted(&[], dimension(&applied.dimensions, DimensionSource::CanonicalAccess));

    let mut attributes = match &primitives {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    attributes.insert("canonical_activities".to_string(), json!(canonical_activities));
    attributes.insert("canonical_roles".to_string(), json!(canonical_roles));
    attributes.insert("canonical_place_types".to_string(), json!(canonical_place_types));
    attributes.insert("canonical_access".to_string(), json!(canonical_access));
    attributes.insert("modules".to_string(), applied.modules.clone());

    let external_ids: Map<String, Value> = candidate.ids.iter().map(|(k, v)| (k.clone(), json!(v))).collect();

    outcome.extraction_success += 1;

    let extracted = InsertExtractedEntity {
        source: candidate.source.clone(),
        entity_class: entity_class.as_str().to_string(),
        attributes: Value::Object(attributes.clone()),
        discovered_attributes: phase1.discovered_attrs.clone(),
        external_ids: Value::Object(external_ids),
        raw_ingestion_id: raw_row.id,
    };
    if let Err(e) = store.insert_extracted_entity(extracted).await {
        outcome.persistence_errors.push(format!("{}: extracted entity insert failed: {e}", candidate.source));
        return;
    }

    let slug = slugify(&candidate.source, &candidate.name);
    let upsert = UpsertEntity {
        entity_name: candidate.name.clone(),
        entity_class: entity_class.as_str().to_string(),
        slug,
        canonical_activities,
        canonical_roles,
        canonical_place_types,
        canonical_access,
        modules: applied.modules,
        lat: candidate.lat,
        lng: candidate.lng,
        address: candidate.address.clone(),
        phone: attributes.get("phone").and_then(|v| v.as_str()).map(str::to_string),
        email: attributes.get("email").and_then(|v| v.as_str()).map(str::to_string),
        website: attributes.get("website").and_then(|v| v.as_str()).map(str::to_string),
    };

    match store.upsert_entity(upsert).await {
        Ok(UpsertOutcome::Created(_)) => {
            outcome.persisted_count += 1;
            outcome.entities_created += 1;
        }
        Ok(UpsertOutcome::Updated(_)) => {
            outcome.persisted_count += 1;
            outcome.entities_updated += 1;
        }
        Err(e) => {
            outcome.persistence_errors.push(format!("{}: entity upsert failed: {e}", candidate.source));
        }
    }
}

/// Persist every accepted entity from one orchestration run. Failures on
/// one candidate are recorded and do not abort the batch (§4.10, §7).
pub async fn persist_accepted_entities(
    store: &Store,
    ctx: &ExecutionContext,
    state: &OrchestratorState,
    llm: &dyn LlmExtractor,
) -> PersistenceOutcome {
    let mut outcome = PersistenceOutcome::default();
    for accepted in &state.accepted_entities {
        persist_one(store, ctx, accepted, llm, &mut outcome).await;
    }
    outcome
}
