use std::collections::HashSet;

use fieldscope_common::{EngineError, Result};
use regex::Regex;

use crate::contract::LensSchema;

/// Runs all ten fail-fast validation gates against a freshly-deserialized
/// lens schema. Any failure names the violated gate and the lens id; no
/// gate is skipped once an earlier one fails (all are checked so the caller
/// gets every violation, not just the first).
pub fn validate_lens_config(lens_id: &str, schema: &LensSchema, known_adapters: &[&str]) -> Result<()> {
    let mut violations = Vec::new();

    // Gate 1: schema presence. serde already requires `schema`, `facets`,
    // `values`, `mapping_rules` to deserialize, but an empty `schema`
    // string is still a configuration error.
    if schema.schema.trim().is_empty() {
        violations.push("gate 1 (schema): `schema` field is empty".to_string());
    }

    // Gate 2: dimension integrity is enforced by `DimensionSource`'s own
    // closed deserialization (an invalid dimension_source fails to parse
    // the YAML at all, which is itself a fail-fast configuration error).

    // Gate 3: value -> facet integrity.
    for value in &schema.values {
        if !schema.facets.contains_key(&value.facet) {
            violations.push(format!(
                "gate 3 (value->facet): value `{}` references undefined facet `{}`",
                value.key, value.facet
            ));
        }
    }

    // Gate 4: rule -> value integrity.
    let value_keys: HashSet<&str> = schema.values.iter().map(|v| v.key.as_str()).collect();
    for rule in &schema.mapping_rules {
        if !value_keys.contains(rule.canonical.as_str()) {
            violations.push(format!(
                "gate 4 (rule->value): mapping rule `{}` references undefined value `{}`",
                rule.pattern, rule.canonical
            ));
        }
    }

    // Gate 5: unique value keys.
    let mut seen_keys = HashSet::new();
    for value in &schema.values {
        if !seen_keys.insert(value.key.as_str()) {
            violations.push(format!("gate 5 (unique values): duplicate value key `{}`", value.key));
        }
    }

    // Gate 6: connector refs.
    for adapter_name in schema.connector_rules.keys() {
        if !known_adapters.contains(&adapter_name.as_str()) {
            violations.push(format!(
                "gate 6 (connector refs): connector_rules names unregistered adapter `{adapter_name}`"
            ));
        }
    }

    // Gate 7: regex compilation.
    for rule in &schema.mapping_rules {
        if let Err(e) = Regex::new(&rule.pattern) {
            violations.push(format!(
                "gate 7 (regex): mapping rule pattern `{}` fails to compile: {e}",
                rule.pattern
            ));
        }
    }
    for module in schema.modules.values() {
        for field_rule in &module.field_rules {
            if let Some(pattern) = &field_rule.pattern {
                if let Err(e) = Regex::new(pattern) {
                    violations.push(format!(
                        "gate 7 (regex): field rule pattern `{pattern}` fails to compile: {e}"
                    ));
                }
            }
        }
    }

    // Gate 8: coverage — every facet has at least one value.
    let facets_with_values: HashSet<&str> = schema.values.iter().map(|v| v.facet.as_str()).collect();
    for facet_key in schema.facets.keys() {
        if !facets_with_values.contains(facet_key.as_str()) {
            violations.push(format!("gate 8 (coverage): facet `{facet_key}` has no values"));
        }
    }

    // Gate 9: module-trigger refs.
    let module_names: HashSet<&str> = schema.modules.keys().map(|k| k.as_str()).collect();
    for trigger in &schema.module_triggers {
        if !schema.facets.contains_key(&trigger.when.facet) {
            violations.push(format!(
                "gate 9 (module triggers): trigger references undefined facet `{}`",
                trigger.when.facet
            ));
        }
        for module_name in &trigger.add_modules {
            if !module_names.contains(module_name.as_str()) {
                violations.push(format!(
                    "gate 9 (module triggers): trigger adds undefined module `{module_name}`"
                ));
            }
        }
    }

    // Gate 10: derived-grouping refs. `EntityClass` deserialization already
    // restricts values to the five-member closed enum, so a successfully
    // parsed `DerivedRule` trivially satisfies this gate; nothing further
    // to check here beyond parse success.
    let _ = &schema.derived_groupings;

    if violations.is_empty() {
        Ok(())
    } else {
        Err(EngineError::LensValidation(format!(
            "lens `{lens_id}` failed validation:\n{}",
            violations.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::*;
    use std::collections::BTreeMap;

    fn minimal_schema() -> LensSchema {
        LensSchema {
            schema: "v1".into(),
            facets: BTreeMap::from([(
                "activity".to_string(),
                Facet {
                    dimension_source: fieldscope_common::DimensionSource::CanonicalActivities,
                    ui_label: None,
                    display_mode: None,
                    order: None,
                    flags: vec![],
                },
            )]),
            values: vec![ValueDef {
                key: "padel".into(),
                facet: "activity".into(),
                display_name: None,
            }],
            mapping_rules: vec![MappingRule {
                pattern: "(?i)padel".into(),
                canonical: "padel".into(),
                confidence: None,
                source_fields: None,
            }],
            modules: BTreeMap::new(),
            module_triggers: vec![],
            derived_groupings: vec![],
            connector_rules: BTreeMap::new(),
            confidence_threshold: None,
            query_keywords: QueryKeywords::default(),
        }
    }

    #[test]
    fn minimal_schema_passes() {
        assert!(validate_lens_config("test", &minimal_schema(), &[]).is_ok());
    }

    #[test]
    fn dangling_value_facet_fails() {
        let mut schema = minimal_schema();
        schema.values[0].facet = "nonexistent".into();
        let err = validate_lens_config("test", &schema, &[]).unwrap_err();
        assert!(err.to_string().contains("gate 3"));
    }

    #[test]
    fn dangling_rule_canonical_fails() {
        let mut schema = minimal_schema();
        schema.mapping_rules[0].canonical = "tennis".into();
        let err = validate_lens_config("test", &schema, &[]).unwrap_err();
        assert!(err.to_string().contains("gate 4"));
    }

    #[test]
    fn duplicate_value_keys_fail() {
        let mut schema = minimal_schema();
        schema.values.push(ValueDef {
            key: "padel".into(),
            facet: "activity".into(),
            display_name: None,
        });
        let err = validate_lens_config("test", &schema, &[]).unwrap_err();
        assert!(err.to_string().contains("gate 5"));
    }

    #[test]
    fn bad_regex_fails() {
        let mut schema = minimal_schema();
        schema.mapping_rules[0].pattern = "(unclosed".into();
        let err = validate_lens_config("test", &schema, &[]).unwrap_err();
        assert!(err.to_string().contains("gate 7"));
    }

    #[test]
    fn facet_without_values_fails_coverage() {
        let mut schema = minimal_schema();
        schema.facets.insert(
            "access".to_string(),
            Facet {
                dimension_source: fieldscope_common::DimensionSource::CanonicalAccess,
                ui_label: None,
                display_mode: None,
                order: None,
                flags: vec![],
            },
        );
        let err = validate_lens_config("test", &schema, &[]).unwrap_err();
        assert!(err.to_string().contains("gate 8"));
    }

    #[test]
    fn unregistered_connector_fails() {
        let mut schema = minimal_schema();
        schema
            .connector_rules
            .insert("made_up_adapter".into(), ConnectorRule::default());
        let err = validate_lens_config("test", &schema, &["google_places"]).unwrap_err();
        assert!(err.to_string().contains("gate 6"));
    }
}
