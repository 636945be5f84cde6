use std::path::{Path, PathBuf};

use fieldscope_common::{EngineError, Result};
use sha2::{Digest, Sha256};

use crate::contract::{
    ConnectorRule, DerivedGrouping, Facet, LensSchema, MappingRule, ModuleDef, ModuleTrigger,
    QueryKeywords, ValueDef,
};
use crate::validator::validate_lens_config;

/// A validated, immutable lens. Frozen after `load`; safe to share, log, and
/// hash across concurrently-running adapter tasks.
#[derive(Debug, Clone)]
pub struct LensContract {
    pub lens_id: String,
    /// SHA-256 of the canonicalised source YAML, for reproducibility
    /// logging and idempotency tests.
    pub lens_hash: String,
    schema: LensSchema,
}

impl LensContract {
    /// Load `<search_path>/<lens_id>.yaml`, validate it against all ten
    /// gates, and freeze it. Any gate failure is a fatal configuration
    /// error — no partial or lazy validation.
    pub fn load(lens_id: &str, search_path: &Path, known_adapters: &[&str]) -> Result<Self> {
        let file_path = search_path.join(format!("{lens_id}.yaml"));
        let raw = std::fs::read_to_string(&file_path).map_err(|e| {
            EngineError::LensValidation(format!(
                "cannot read lens file `{}`: {e}",
                file_path.display()
            ))
        })?;
        Self::from_yaml_str(lens_id, &raw, known_adapters)
    }

    /// Parse and validate a lens from an in-memory YAML document. Split out
    /// from `load` so tests can exercise validation without touching disk.
    pub fn from_yaml_str(lens_id: &str, raw: &str, known_adapters: &[&str]) -> Result<Self> {
        let schema: LensSchema = serde_yaml::from_str(raw).map_err(|e| {
            EngineError::LensValidation(format!("lens `{lens_id}` failed to parse: {e}"))
        })?;
        validate_lens_config(lens_id, &schema, known_adapters)?;

        let digest = Sha256::digest(raw.as_bytes());
        let lens_hash = hex::encode(digest);

        Ok(Self {
            lens_id: lens_id.to_string(),
            lens_hash,
            schema,
        })
    }

    pub fn facets(&self) -> &std::collections::BTreeMap<String, Facet> {
        &self.schema.facets
    }

    pub fn values(&self) -> &[ValueDef] {
        &self.schema.values
    }

    pub fn mapping_rules(&self) -> &[MappingRule] {
        &self.schema.mapping_rules
    }

    pub fn modules(&self) -> &std::collections::BTreeMap<String, ModuleDef> {
        &self.schema.modules
    }

    pub fn module_triggers(&self) -> &[ModuleTrigger] {
        &self.schema.module_triggers
    }

    pub fn derived_groupings(&self) -> &[DerivedGrouping] {
        &self.schema.derived_groupings
    }

    pub fn connector_rules(&self) -> &std::collections::BTreeMap<String, ConnectorRule> {
        &self.schema.connector_rules
    }

    pub fn confidence_threshold(&self) -> Option<f64> {
        self.schema.confidence_threshold
    }

    pub fn query_keywords(&self) -> &QueryKeywords {
        &self.schema.query_keywords
    }

    /// Look up the value key's facet, then that facet's dimension source.
    /// Used by mapping-rule resolution and by module-trigger evaluation.
    pub fn facet_for_value(&self, value_key: &str) -> Option<&str> {
        self.schema
            .values
            .iter()
            .find(|v| v.key == value_key)
            .map(|v| v.facet.as_str())
    }

    /// True for a lens with no mapping rules, no triggers, and no modules —
    /// `apply_lens` must be a no-op over one of these.
    pub fn is_empty_contract(&self) -> bool {
        self.schema.mapping_rules.is_empty()
            && self.schema.module_triggers.is_empty()
            && self.schema.modules.is_empty()
    }
}

/// Resolve which lens id to use, in precedence order: explicit CLI flag >
/// `LENS_ID` environment variable > application config's `default_lens` >
/// `--allow-default-lens` dev fallback. Returns `None` (process should exit
/// with an error) if no source supplies an id and no fallback is permitted.
pub fn resolve_lens_id(
    cli_lens: Option<&str>,
    env_lens: Option<&str>,
    config_default_lens: Option<&str>,
    dev_fallback: Option<&str>,
) -> Option<String> {
    if let Some(id) = cli_lens {
        return Some(id.to_string());
    }
    if let Some(id) = env_lens {
        return Some(id.to_string());
    }
    if let Some(id) = config_default_lens {
        return Some(id.to_string());
    }
    if let Some(id) = dev_fallback {
        eprintln!("warning: falling back to dev/test-only lens `{id}` (--allow-default-lens)");
        return Some(id.to_string());
    }
    None
}

pub fn default_search_path() -> PathBuf {
    PathBuf::from("./lenses")
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn loads_and_validates_padel_lens() {
        let contract = LensContract::from_yaml_str("padel", PADEL_LENS, &[]).unwrap();
        assert_eq!(contract.lens_id, "padel");
        assert_eq!(contract.lens_hash.len(), 64);
        assert!(!contract.is_empty_contract());
        assert_eq!(contract.facet_for_value("padel"), Some("activity"));
    }

    #[test]
    fn empty_contract_has_no_rules_triggers_modules() {
        let minimal = "schema: v1\nfacets: {}\nvalues: []\nmapping_rules: []\n";
        let contract = LensContract::from_yaml_str("empty", minimal, &[]).unwrap();
        assert!(contract.is_empty_contract());
    }

    #[test]
    fn resolution_precedence_prefers_cli_over_all() {
        let resolved = resolve_lens_id(Some("cli-lens"), Some("env-lens"), Some("cfg-lens"), None);
        assert_eq!(resolved, Some("cli-lens".to_string()));
    }

    #[test]
    fn resolution_falls_back_to_env_then_config_then_dev() {
        assert_eq!(
            resolve_lens_id(None, Some("env-lens"), Some("cfg-lens"), None),
            Some("env-lens".to_string())
        );
        assert_eq!(
            resolve_lens_id(None, None, Some("cfg-lens"), None),
            Some("cfg-lens".to_string())
        );
        assert_eq!(
            resolve_lens_id(None, None, None, Some("dev-lens")),
            Some("dev-lens".to_string())
        );
        assert_eq!(resolve_lens_id(None, None, None, None), None);
    }
}
