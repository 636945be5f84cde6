// Phase 2: lens-driven mapping onto the four canonical dimensions, followed
// by module-trigger evaluation and field-rule execution. A contract with no
// mapping rules, no triggers and no modules (`is_empty_contract`) is a
// documented no-op: every candidate passes through with empty dimension
// arrays and no modules attached.

pub mod extractor;
pub mod normalizer;

use std::collections::BTreeMap;

use fieldscope_common::{DimensionSource, EntityClass};
use fieldscope_lens::contract::{MappingRule, DEFAULT_MAPPING_SOURCE_FIELDS};
use fieldscope_lens::LensContract;
use regex::Regex;
use serde_json::{Map, Value};

use extractor::run_extractor;
use normalizer::apply_normalizers;

/// Output of one Phase 2 pass: the four canonical dimension arrays plus any
/// populated modules, ready to be merged into an entity's attributes.
#[derive(Debug, Clone, Default)]
pub struct AppliedLens {
    pub dimensions: BTreeMap<DimensionSource, Vec<String>>,
    pub modules: Value,
}

fn field_text(primitives: &Value, field: &str) -> Option<String> {
    // `entity_name` is the contract's historical default field name for the
    // primary name; this engine's primitives key the same value as `name`.
    let resolved_field = if field == "entity_name" { "name" } else { field };
    match primitives.get(resolved_field)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().filter_map(|v| v.as_str()).map(str::to_string).collect();
            if joined.is_empty() {
                None
            } else {
                Some(joined.join(" "))
            }
        }
        _ => None,
    }
}

fn haystack(primitives: &Value, fields: &[String]) -> String {
    fields
        .iter()
        .filter_map(|f| field_text(primitives, f))
        .collect::<Vec<_>>()
        .join(" \n ")
}

fn rule_source_fields(rule: &MappingRule) -> Vec<String> {
    rule.source_fields
        .clone()
        .unwrap_or_else(|| DEFAULT_MAPPING_SOURCE_FIELDS.iter().map(|s| s.to_string()).collect())
}

/// Run every mapping rule against the candidate's primitives, accumulating
/// matched canonical values per dimension. Rules whose pattern fails to
/// compile are skipped; the lens loader's validation gate already rejects
/// these at load time so this is a defensive no-op in practice.
fn run_mapping(lens: &LensContract, primitives: &Value) -> BTreeMap<DimensionSource, Vec<String>> {
    let mut dimensions: BTreeMap<DimensionSource, Vec<String>> = BTreeMap::new();

    for rule in lens.mapping_rules() {
        let Ok(re) = Regex::new(&rule.pattern) else { continue };
        let text = haystack(primitives, &rule_source_fields(rule));
        if !re.is_match(&text) {
            continue;
        }
        let Some(facet_name) = lens.facet_for_value(&rule.canonical) else { continue };
        let Some(facet) = lens.facets().get(facet_name) else { continue };
        let entry = dimensions.entry(facet.dimension_source).or_default();
        if !entry.contains(&rule.canonical) {
            entry.push(rule.canonical.clone());
        }
    }

    for values in dimensions.values_mut() {
        values.sort();
    }
    dimensions
}

/// A trigger fires when its facet's accumulated dimension values contain
/// `when.value` and every condition matches the candidate's entity class.
fn trigger_fires(
    lens: &LensContract,
    trigger: &fieldscope_lens::contract::ModuleTrigger,
    dimensions: &BTreeMap<DimensionSource, Vec<String>>,
    entity_class: EntityClass,
) -> bool {
    let Some(facet) = lens.facets().get(&trigger.when.facet) else { return false };
    let has_value = dimensions
        .get(&facet.dimension_source)
        .map(|values| values.contains(&trigger.when.value))
        .unwrap_or(false);
    if !has_value {
        return false;
    }
    trigger
        .conditions
        .iter()
        .all(|c| c.entity_class.map(|ec| ec == entity_class).unwrap_or(true))
}

fn resolve_active_modules(
    lens: &LensContract,
    dimensions: &BTreeMap<DimensionSource, Vec<String>>,
    entity_class: EntityClass,
) -> Vec<String> {
    let mut modules = Vec::new();
    for trigger in lens.module_triggers() {
        if trigger_fires(lens, trigger, dimensions, entity_class) {
            for m in &trigger.add_modules {
                if !modules.contains(m) {
                    modules.push(m.clone());
                }
            }
        }
    }
    modules
}

fn set_dotted_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut().expect("just ensured object");
    }
}

fn field_rule_applies(rule: &fieldscope_lens::contract::FieldRule, source: &str, entity_class: EntityClass) -> bool {
    let source_ok = rule.applicability.source.is_empty() || rule.applicability.source.iter().any(|s| s == source);
    let class_ok = rule.applicability.entity_class.is_empty()
        || rule.applicability.entity_class.contains(&entity_class);
    source_ok && class_ok
}

fn run_field_rules(
    lens: &LensContract,
    module_names: &[String],
    primitives: &Value,
    source: &str,
    entity_class: EntityClass,
) -> Value {
    let mut modules = Map::new();
    for name in module_names {
        let Some(module_def) = lens.modules().get(name) else { continue };
        let mut fields = Map::new();
        for rule in &module_def.field_rules {
            if !field_rule_applies(rule, source, entity_class) {
                continue;
            }
            let text = haystack(primitives, &rule.source_fields);
            let Some(raw_value) = run_extractor(rule.extractor, rule.pattern.as_deref(), &text) else {
                continue;
            };
            let normalized = apply_normalizers(&rule.normalizers, raw_value);
            set_dotted_path(&mut fields, &rule.target_path, normalized);
        }
        if !fields.is_empty() {
            modules.insert(name.clone(), Value::Object(fields));
        }
    }
    Value::Object(modules)
}

/// Run Phase 2 end to end. A no-op on an empty lens contract: returns empty
/// dimensions and an empty `modules` object without touching `primitives`.
pub fn apply_lens(lens: &LensContract, primitives: &Value, source: &str, entity_class: EntityClass) -> AppliedLens {
    if lens.is_empty_contract() {
        return AppliedLens::default();
    }
    let dimensions = run_mapping(lens, primitives);
    let active_modules = resolve_active_modules(lens, &dimensions, entity_class);
    let modules = run_field_rules(lens, &active_modules, primitives, source, entity_class);
    AppliedLens { dimensions, modules }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PADEL_LENS: &str = r#"
schema: v1
facets:
  activity:
    dimension_source: canonical_activities
modules:
  sports_facility:
    field_rules:
      - target_path: padel_courts.total
        extractor: regex_capture
        pattern: "(\\d+)\\s*padel\\s*courts?"
        source_fields: [description]
        normalizers: [round_integer]
values:
  - key: padel
    facet: activity
mapping_rules:
  - pattern: "(?i)padel"
    canonical: padel
module_triggers:
  - when: { facet: activity, value: padel }
    add_modules: [sports_facility]
    conditions:
      - entity_class: place
"#;

    #[test]
    fn empty_lens_is_a_no_op() {
        let empty = LensContract::from_yaml_str("empty", "schema: v1\nfacets: {}\nvalues: []\nmapping_rules: []\n", &[]).unwrap();
        let primitives = json!({"name": "Anywhere", "description": "3 padel courts"});
        let result = apply_lens(&empty, &primitives, "serper", EntityClass::Place);
        assert!(result.dimensions.is_empty());
        assert_eq!(result.modules, json!({}));
    }

    #[test]
    fn mapping_and_trigger_and_field_rule_fire_together() {
        let lens = LensContract::from_yaml_str("padel", PADEL_LENS, &[]).unwrap();
        let primitives = json!({"name": "Oriam", "description": "This venue has 4 padel courts available"});
        let result = apply_lens(&lens, &primitives, "serper", EntityClass::Place);
        assert_eq!(
            result.dimensions.get(&DimensionSource::CanonicalActivities),
            Some(&vec!["padel".to_string()])
        );
        assert_eq!(result.modules["sports_facility"]["padel_courts"]["total"], json!(4));
    }

    #[test]
    fn trigger_condition_blocks_wrong_entity_class() {
        let lens = LensContract::from_yaml_str("padel", PADEL_LENS, &[]).unwrap();
        let primitives = json!({"name": "Padel League", "description": "padel league with 4 padel courts"});
        let result = apply_lens(&lens, &primitives, "serper", EntityClass::Organization);
        assert_eq!(result.modules, json!({}));
    }
}
