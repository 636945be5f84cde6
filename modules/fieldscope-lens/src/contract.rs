use std::collections::BTreeMap;

use fieldscope_common::{DimensionSource, EntityClass};
use serde::{Deserialize, Serialize};

/// One entry of `facets`: a lens-level UI/semantic grouping bound to exactly
/// one canonical dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facet {
    pub dimension_source: DimensionSource,
    #[serde(default)]
    pub ui_label: Option<String>,
    #[serde(default)]
    pub display_mode: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub flags: Vec<String>,
}

/// One entry of `values`: a canonical value bound to a facet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueDef {
    pub key: String,
    pub facet: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One entry of `mapping_rules`: a regex over source fields that, on match,
/// appends `canonical` to the facet's dimension array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    pub pattern: String,
    pub canonical: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source_fields: Option<Vec<String>>,
}

pub const DEFAULT_MAPPING_SOURCE_FIELDS: &[&str] =
    &["entity_name", "description", "raw_categories"];

/// Closed set of extractors a field rule may use. Unknown extractor names
/// are a configuration error at load time, never a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    RegexCapture,
    NumericParser,
}

/// Closed set of normalizers a field rule may chain, applied left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizerKind {
    Trim,
    Lowercase,
    RoundInteger,
}

/// Restricts which (source, entity_class) pairs a field rule applies to.
/// Empty vectors mean "no restriction".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Applicability {
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub entity_class: Vec<EntityClass>,
}

/// One field rule inside a module: extract a value from source fields,
/// normalize it, and write it to a dotted target path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub target_path: String,
    pub extractor: ExtractorKind,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub source_fields: Vec<String>,
    #[serde(default)]
    pub normalizers: Vec<NormalizerKind>,
    #[serde(default)]
    pub applicability: Applicability,
}

/// One entry of `modules`: a nested structured sub-object populated by field
/// rules when a trigger fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub field_rules: Vec<FieldRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerWhen {
    pub facet: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerCondition {
    #[serde(default)]
    pub entity_class: Option<EntityClass>,
}

/// One entry of `module_triggers`: fires `add_modules` when a facet's
/// collected canonical values contain `when.value` and every condition
/// matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleTrigger {
    pub when: TriggerWhen,
    #[serde(default)]
    pub add_modules: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<TriggerCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRule {
    pub entity_class: EntityClass,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// One entry of `derived_groupings`: a label computed from entity_class +
/// role combinations, used by downstream presentation (outside this core).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedGrouping {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub rules: Vec<DerivedRule>,
}

/// Lens-driven planner hint for one adapter: keywords that, when present in
/// the query, add the named adapter to the plan. Planner defaults apply
/// when a lens carries no `connector_rules` for a given adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorRule {
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// The raw, as-deserialized shape of a lens YAML file. Never used directly
/// once validated — `LensContract::load` wraps it and exposes typed
/// accessors only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LensSchema {
    pub schema: String,
    pub facets: BTreeMap<String, Facet>,
    pub values: Vec<ValueDef>,
    pub mapping_rules: Vec<MappingRule>,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleDef>,
    #[serde(default)]
    pub module_triggers: Vec<ModuleTrigger>,
    #[serde(default)]
    pub derived_groupings: Vec<DerivedGrouping>,
    #[serde(default)]
    pub connector_rules: BTreeMap<String, ConnectorRule>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    /// Category/specific-venue/location keyword sets consumed by query
    /// feature extraction. Lens-supplied so the engine carries no domain
    /// literals.
    #[serde(default)]
    pub query_keywords: QueryKeywords,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryKeywords {
    #[serde(default)]
    pub category_terms: Vec<String>,
    #[serde(default)]
    pub specific_indicators: Vec<String>,
    #[serde(default)]
    pub location_names: Vec<String>,
}
