// Phase 1: deterministic, per-source extraction of schema primitives from a
// raw payload. Structured sources (maps/registries) are field-mapped
// directly; the one unstructured source (web search snippets) crosses an
// opaque extraction boundary to an `LlmExtractor`. Either path's output
// passes through `validate` (boundary check + cleanup) then `split` (schema
// vs. discovered) before it can reach an entity's attributes.

pub mod llm;

use async_trait::async_trait;
use fieldscope_common::{Candidate, EngineError, Result};
use serde_json::{Map, Value};

pub use llm::{LlmExtractor, NullLlmExtractor};

/// Every field name Phase 1 is allowed to fold into `schema_attrs`.
/// Anything else present after `validate` lands in `discovered_attrs`
/// instead of being dropped.
pub const PRIMITIVE_WHITELIST: &[&str] = &[
    "name",
    "address",
    "street",
    "description",
    "latitude",
    "longitude",
    "lat",
    "lng",
    "type_hint",
    "raw_categories",
    "activities",
    "place_types",
    "phone",
    "email",
    "website",
    "start_datetime",
    "end_datetime",
    "start_date",
    "end_date",
    "provides_equipment",
    "equipment_count",
    "membership_required",
    "is_members_only",
    "provides_instruction",
    "sells_goods",
    "is_person",
];

/// Phase 2's exclusive fields. A Phase 1 extractor that emits any of these
/// has crossed the extraction boundary — a contract violation, fatal to
/// that one candidate's extraction (not the whole run).
const FORBIDDEN_PHASE2_KEYS: &[&str] = &[
    "canonical_activities",
    "canonical_roles",
    "canonical_place_types",
    "canonical_access",
    "modules",
];

/// Sources with a well-defined, deterministically field-mappable response
/// shape. Everything not in this table — including a source this process
/// has never seen before — is conservatively treated as unstructured and
/// routed through `LlmExtractor` rather than silently producing an empty
/// mapping (§4.7: "unknown sources default to needs extraction").
const STRUCTURED_SOURCES: &[&str] =
    &["google_places", "openstreetmap", "sport_scotland", "os_bulk_release", "domain_registry"];

fn is_unstructured(source: &str) -> bool {
    !STRUCTURED_SOURCES.contains(&source)
}

fn dedupe_string_array(value: &Value) -> Option<Value> {
    let arr = value.as_array()?;
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for item in arr {
        if let Some(s) = item.as_str() {
            if seen.insert(s.to_string()) {
                out.push(Value::String(s.to_string()));
            }
        }
    }
    Some(Value::Array(out))
}

fn out_of_range_coordinate(attributes: &Value, lat_key: &str, lng_key: &str) -> bool {
    let lat = attributes.get(lat_key).and_then(|v| v.as_f64());
    let lng = attributes.get(lng_key).and_then(|v| v.as_f64());
    lat.map(|l| l.abs() > 90.0).unwrap_or(false) || lng.map(|l| l.abs() > 180.0).unwrap_or(false)
}

/// `validate(attributes) -> attributes` (§4.7): reject a boundary
/// violation, require a non-empty `name`, drop out-of-range coordinates,
/// dedupe `raw_categories`.
pub fn validate(attributes: Value) -> Result<Value> {
    let Value::Object(mut map) = attributes else {
        return Err(EngineError::ExtractionBoundary("attributes must be a JSON object".to_string()));
    };

    for forbidden in FORBIDDEN_PHASE2_KEYS {
        if map.contains_key(*forbidden) {
            return Err(EngineError::ExtractionBoundary(format!(
                "phase 1 extractor emitted phase-2 field `{forbidden}`"
            )));
        }
    }

    let name_ok = map.get("name").and_then(|v| v.as_str()).map(|s| !s.trim().is_empty()).unwrap_or(false);
    if !name_ok {
        return Err(EngineError::ExtractionBoundary("missing or empty required field `name`".to_string()));
    }

    if out_of_range_coordinate(&Value::Object(map.clone()), "latitude", "longitude") {
        map.remove("latitude");
        map.remove("longitude");
    }
    if out_of_range_coordinate(&Value::Object(map.clone()), "lat", "lng") {
        map.remove("lat");
        map.remove("lng");
    }

    if let Some(raw_categories) = map.get("raw_categories") {
        if let Some(deduped) = dedupe_string_array(raw_categories) {
            map.insert("raw_categories".to_string(), deduped);
        }
    }

    Ok(Value::Object(map))
}

/// `split(attributes) -> (schema_attrs, discovered_attrs)` (§4.7): compare
/// keys against `PRIMITIVE_WHITELIST`; matched keys become `schema_attrs`,
/// everything else `discovered_attrs`. Both are preserved — nothing is
/// dropped past this point.
pub fn split(attributes: Value) -> (Value, Value) {
    let Value::Object(map) = attributes else {
        return (Value::Object(Map::new()), Value::Object(Map::new()));
    };
    let mut schema_attrs = Map::new();
    let mut discovered_attrs = Map::new();
    for (key, value) in map {
        if PRIMITIVE_WHITELIST.contains(&key.as_str()) {
            schema_attrs.insert(key, value);
        } else {
            discovered_attrs.insert(key, value);
        }
    }
    (Value::Object(schema_attrs), Value::Object(discovered_attrs))
}

fn str_field(value: &Value, key: &str) -> Option<Value> {
    value.get(key).and_then(|v| v.as_str()).map(|s| Value::String(s.to_string()))
}

fn num_field(value: &Value, key: &str) -> Option<Value> {
    value.get(key).and_then(|v| v.as_f64()).map(|n| serde_json::json!(n))
}

fn bool_field(value: &Value, key: &str) -> Option<Value> {
    value.get(key).and_then(|v| v.as_bool()).map(Value::Bool)
}

fn string_array(value: &Value, key: &str) -> Option<Value> {
    let arr = value.get(key)?.as_array()?;
    let strings: Vec<Value> = arr.iter().filter(|v| v.is_string()).cloned().collect();
    if strings.is_empty() {
        None
    } else {
        Some(Value::Array(strings))
    }
}

fn insert_if_some(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v);
    }
}

/// Deterministic field mapping for a structured source's raw payload, keyed
/// by the candidate's `source` rather than `AdapterKind` so the mapping
/// keeps working if a new kind shares an existing source's payload shape.
fn extract_structured(source: &str, raw: &Value) -> Value {
    let mut out = Map::new();
    match source {
        "google_places" => {
            insert_if_some(&mut out, "phone", str_field(raw, "formatted_phone_number"));
            insert_if_some(&mut out, "website", str_field(raw, "website"));
            insert_if_some(&mut out, "raw_categories", string_array(raw, "types"));
            if let Some(Value::Array(types)) = string_array(raw, "types") {
                if let Some(Value::String(first)) = types.first() {
                    out.insert("type_hint".to_string(), Value::String(first.clone()));
                }
            }
        }
        "openstreetmap" => {
            insert_if_some(&mut out, "type_hint", str_field(raw, "type"));
            insert_if_some(&mut out, "raw_categories", string_array(raw, "category"));
        }
        "sport_scotland" => {
            insert_if_some(&mut out, "place_types", string_array(raw, "facility_type"));
            insert_if_some(&mut out, "activities", string_array(raw, "sports"));
            insert_if_some(&mut out, "equipment_count", num_field(raw, "equipment_count"));
            insert_if_some(&mut out, "provides_equipment", bool_field(raw, "provides_equipment"));
            insert_if_some(&mut out, "membership_required", bool_field(raw, "membership_required"));
        }
        "os_bulk_release" => {
            insert_if_some(&mut out, "place_types", string_array(raw, "descriptive_group"));
        }
        "domain_registry" => {
            insert_if_some(&mut out, "phone", str_field(raw, "registrant_phone"));
            insert_if_some(&mut out, "email", str_field(raw, "registrant_email"));
            out.insert("type_hint".to_string(), Value::String("organization".to_string()));
        }
        _ => {}
    }
    Value::Object(out)
}

/// Baseline primitives every candidate already carries after adapter
/// mapping, independent of source-specific extraction.
fn baseline_from_candidate(candidate: &Candidate) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("name".to_string(), Value::String(candidate.name.clone()));
    insert_if_some(&mut map, "address", candidate.address.clone().map(Value::String));
    insert_if_some(&mut map, "latitude", candidate.lat.map(|v| serde_json::json!(v)));
    insert_if_some(&mut map, "longitude", candidate.lng.map(|v| serde_json::json!(v)));
    let description = ["description", "snippet", "editorial_summary"]
        .iter()
        .find_map(|key| str_field(&candidate.raw, key));
    insert_if_some(&mut map, "description", description);
    map
}

fn merge_objects(base: &mut Map<String, Value>, overlay: Value) {
    if let Value::Object(overlay_map) = overlay {
        for (k, v) in overlay_map {
            base.insert(k, v);
        }
    }
}

/// Output of one Phase 1 pass: schema-known primitives (fed to the
/// classifier and Phase 2) plus whatever else the source/extractor
/// produced that isn't part of the schema vocabulary, preserved rather
/// than discarded.
#[derive(Debug, Clone)]
pub struct Phase1Output {
    pub schema_attrs: Value,
    pub discovered_attrs: Value,
}

/// Run Phase 1 for one candidate: deterministic mapping for structured
/// sources, an `LlmExtractor` boundary crossing for the one unstructured
/// source. Either path's raw output then passes through `validate`
/// (boundary check, required-field check, coordinate/category cleanup)
/// and `split` (schema vs. discovered) before being returned.
pub async fn run_phase1(candidate: &Candidate, llm: &dyn LlmExtractor) -> Result<Phase1Output> {
    let mut primitives = baseline_from_candidate(candidate);

    if is_unstructured(&candidate.source) {
        let extracted = llm
            .extract(&candidate.raw)
            .await
            .map_err(|e| EngineError::ExtractionBoundary(format!("llm_extract failed: {e}")))?;
        merge_objects(&mut primitives, extracted);
    } else {
        let extracted = extract_structured(&candidate.source, &candidate.raw);
        merge_objects(&mut primitives, extracted);
    }

    let validated = validate(Value::Object(primitives))?;
    let (schema_attrs, discovered_attrs) = split(validated);
    Ok(Phase1Output { schema_attrs, discovered_attrs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn candidate(source: &str, raw: Value) -> Candidate {
        Candidate {
            name: "Test Place".to_string(),
            ids: BTreeMap::new(),
            lat: Some(55.9),
            lng: Some(-3.1),
            address: Some("1 Test Road".to_string()),
            source: source.to_string(),
            raw,
        }
    }

    #[tokio::test]
    async fn structured_source_never_touches_llm() {
        let c = candidate(
            "google_places",
            serde_json::json!({"formatted_phone_number": "01234", "types": ["retailer"]}),
        );
        let result = run_phase1(&c, &NullLlmExtractor).await.unwrap();
        assert_eq!(result.schema_attrs.get("phone").and_then(|v| v.as_str()), Some("01234"));
        assert_eq!(result.schema_attrs.get("type_hint").and_then(|v| v.as_str()), Some("retailer"));
    }

    #[test]
    fn split_routes_unknown_keys_to_discovered_not_dropped() {
        let value = serde_json::json!({"name": "X", "made_up_field": "evil"});
        let (schema, discovered) = split(value);
        assert!(schema.get("name").is_some());
        assert!(schema.get("made_up_field").is_none());
        assert_eq!(discovered.get("made_up_field").and_then(|v| v.as_str()), Some("evil"));
    }

    #[test]
    fn validate_rejects_phase2_field_as_boundary_violation() {
        let value = serde_json::json!({"name": "X", "canonical_activities": ["padel"]});
        let err = validate(value).unwrap_err();
        assert!(matches!(err, EngineError::ExtractionBoundary(_)));
    }

    #[test]
    fn validate_rejects_missing_name() {
        let value = serde_json::json!({"description": "no name here"});
        assert!(validate(value).is_err());
    }

    #[test]
    fn validate_drops_out_of_range_coordinates() {
        let value = serde_json::json!({"name": "X", "latitude": 200.0, "longitude": -3.1});
        let validated = validate(value).unwrap();
        assert!(validated.get("latitude").is_none());
        assert!(validated.get("longitude").is_none());
    }

    #[test]
    fn validate_dedupes_raw_categories() {
        let value = serde_json::json!({"name": "X", "raw_categories": ["shop", "shop", "retail"]});
        let validated = validate(value).unwrap();
        assert_eq!(validated["raw_categories"], serde_json::json!(["shop", "retail"]));
    }

    #[tokio::test]
    async fn unstructured_source_output_splits_schema_from_discovered() {
        struct HallucinatingExtractor;
        #[async_trait::async_trait]
        impl LlmExtractor for HallucinatingExtractor {
            async fn extract(&self, _raw: &Value) -> anyhow::Result<Value> {
                Ok(serde_json::json!({"activities": ["padel"], "invented_field": "nope"}))
            }
        }
        let c = candidate("serper", serde_json::json!({"snippet": "padel courts available"}));
        let result = run_phase1(&c, &HallucinatingExtractor).await.unwrap();
        assert!(result.schema_attrs.get("activities").is_some());
        assert!(result.schema_attrs.get("invented_field").is_none());
        assert_eq!(
            result.discovered_attrs.get("invented_field").and_then(|v| v.as_str()),
            Some("nope")
        );
    }
}
