// Priority-ordered entity classification and role extraction. This module
// is domain-pure: it reads generic schema fields (type hints, time bounds,
// coordinates) and must never reference a specific vertical's vocabulary
// (sport, venue, cuisine, ...). All domain semantics live in the lens. A
// lint test enforces this at the source-text level.

use fieldscope_common::EntityClass;
use serde_json::Value;

const TIME_BOUND_FIELDS: &[&str] = &["start_datetime", "end_datetime", "start_date", "end_date"];
const ORGANIZATION_TYPE_HINTS: &[&str] = &[
    "retailer",
    "shop",
    "business",
    "organization",
    "league",
    "club",
    "association",
];
const ORGANIZATION_CATEGORY_SUBSTRINGS: &[&str] = &["retail", "shop", "business", "league", "chain"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub entity_class: Option<EntityClass>,
    pub canonical_roles: Vec<String>,
    pub canonical_activities: Vec<String>,
    pub canonical_place_types: Vec<String>,
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key)?.as_str()
}

fn bool_field(v: &Value, key: &str) -> bool {
    v.get(key).and_then(|x| x.as_bool()).unwrap_or(false)
}

fn number_field(v: &Value, key: &str) -> f64 {
    v.get(key).and_then(|x| x.as_f64()).unwrap_or(0.0)
}

fn string_list_field(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(|x| x.as_array())
        .map(|arr| arr.iter().filter_map(|i| i.as_str()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn has_time_bounds(primitives: &Value) -> bool {
    TIME_BOUND_FIELDS.iter().any(|f| primitives.get(f).is_some())
}

fn has_location(primitives: &Value) -> bool {
    let has_coords = primitives.get("latitude").or_else(|| primitives.get("lat")).is_some()
        && primitives.get("longitude").or_else(|| primitives.get("lng")).is_some();
    let has_address = str_field(primitives, "address").is_some() || str_field(primitives, "street").is_some();
    has_coords || has_address
}

fn type_hint(primitives: &Value) -> Option<String> {
    str_field(primitives, "type_hint").map(|s| s.to_lowercase())
}

fn is_organization_like(primitives: &Value) -> bool {
    if let Some(hint) = type_hint(primitives) {
        if ORGANIZATION_TYPE_HINTS.contains(&hint.as_str()) {
            return true;
        }
    }
    string_list_field(primitives, "raw_categories")
        .iter()
        .any(|c| {
            let lower = c.to_lowercase();
            ORGANIZATION_CATEGORY_SUBSTRINGS.iter().any(|s| lower.contains(s))
        })
}

fn is_individual(primitives: &Value) -> bool {
    type_hint(primitives).as_deref() == Some("person") || bool_field(primitives, "is_person")
}

/// Priority algorithm, first match wins: event > place > organization >
/// person > thing.
pub fn resolve_entity_class(primitives: &Value) -> EntityClass {
    if has_time_bounds(primitives) {
        return EntityClass::Event;
    }
    if has_location(primitives) {
        return EntityClass::Place;
    }
    if is_organization_like(primitives) {
        return EntityClass::Organization;
    }
    if is_individual(primitives) {
        return EntityClass::Person;
    }
    EntityClass::Thing
}

/// Multi-valued, extracted independently of class; forced empty for events.
pub fn extract_roles(primitives: &Value, entity_class: EntityClass) -> Vec<String> {
    if entity_class == EntityClass::Event {
        return Vec::new();
    }

    let mut roles = Vec::new();
    if bool_field(primitives, "provides_equipment") || number_field(primitives, "equipment_count") > 0.0 {
        roles.push("provides_facility".to_string());
    }
    if bool_field(primitives, "membership_required") || bool_field(primitives, "is_members_only") {
        roles.push("membership_org".to_string());
    }
    if bool_field(primitives, "provides_instruction") {
        roles.push("provides_instruction".to_string());
    }
    let hint = type_hint(primitives);
    if matches!(hint.as_deref(), Some("retailer") | Some("shop")) || bool_field(primitives, "sells_goods") {
        roles.push("sells_goods".to_string());
    }
    roles.sort();
    roles.dedup();
    roles
}

fn dedup_sorted(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items.dedup();
    items
}

/// Baseline activities/place-types echoed straight from the raw input
/// before any lens mapping runs. Lens mapping rules (phase 2) add to these;
/// this function supplies what a lens-absent classification still needs.
pub fn extract_activities(primitives: &Value) -> Vec<String> {
    dedup_sorted(string_list_field(primitives, "activities"))
}

pub fn extract_place_types(primitives: &Value) -> Vec<String> {
    dedup_sorted(string_list_field(primitives, "place_types"))
}

pub fn resolve(primitives: &Value) -> Classification {
    let entity_class = resolve_entity_class(primitives);
    Classification {
        entity_class: Some(entity_class),
        canonical_roles: extract_roles(primitives, entity_class),
        canonical_activities: extract_activities(primitives),
        canonical_place_types: extract_place_types(primitives),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_precedence_over_place_and_org() {
        let primitives = json!({
            "name": "Edinburgh Padel Open 2024",
            "start_datetime": "2024-05-15T09:00:00Z",
            "end_datetime": "2024-05-17T18:00:00Z",
            "location": "Oriam",
            "latitude": 55.9,
            "longitude": -3.1,
            "activities": ["padel"]
        });
        let result = resolve(&primitives);
        assert_eq!(result.entity_class, Some(EntityClass::Event));
        assert!(result.canonical_roles.is_empty());
        assert_eq!(result.canonical_activities, vec!["padel".to_string()]);
    }

    #[test]
    fn place_with_multiple_roles() {
        let primitives = json!({
            "name": "Craigmillar Tennis Club",
            "address": "123 Tennis Road",
            "latitude": 55.9,
            "longitude": -3.1,
            "provides_equipment": true,
            "membership_required": true,
            "activities": ["tennis"]
        });
        let result = resolve(&primitives);
        assert_eq!(result.entity_class, Some(EntityClass::Place));
        assert!(result.canonical_roles.contains(&"provides_facility".to_string()));
        assert!(result.canonical_roles.contains(&"membership_org".to_string()));
        assert_eq!(result.canonical_activities, vec!["tennis".to_string()]);
    }

    #[test]
    fn organization_before_person_per_priority_order() {
        let primitives = json!({"type_hint": "person", "raw_categories": ["retail chain"]});
        assert_eq!(resolve_entity_class(&primitives), EntityClass::Organization);
    }

    #[test]
    fn no_signals_resolves_to_thing() {
        assert_eq!(resolve_entity_class(&json!({})), EntityClass::Thing);
    }

    /// Enforces the classifier purity invariant: the *production* source
    /// text must never spell out a specific vertical's vocabulary. Scoped to
    /// the region above `#[cfg(test)]` — the test fixtures below it
    /// necessarily name verticals (padel, tennis, ...) to exercise the
    /// classifier, and scanning the whole file would make this assertion
    /// unsatisfiable by construction.
    #[test]
    fn classifier_source_contains_no_domain_literals() {
        let source = include_str!("classify.rs");
        let production = source.split("#[cfg(test)]").next().unwrap();
        let forbidden = [
            "padel", "tennis", "squash", "wine", "winery", "restaurant", "cafe", "golf", "gym",
        ];
        for term in forbidden {
            assert!(
                !production.to_lowercase().contains(term),
                "classifier source contains forbidden domain literal `{term}`"
            );
        }
    }
}
