// Deterministic merge of field values contributed by more than one source
// within a phase (context.* dataflow values) or across sources at
// finalization (§4.6.2, §4.10). Scalars resolve by trust, lists by
// accumulate-then-sort, dicts by recursive per-key merge.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// One source's value for a field, carrying enough to resolve conflicts.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub adapter_name: String,
    pub trust_level: i32,
    pub value: Value,
}

/// Scalar rule: higher `trust_level` wins; on a tie, the lexicographically
/// later adapter name wins.
pub fn merge_scalar(contributions: &[Contribution]) -> Option<Value> {
    contributions
        .iter()
        .filter(|c| !c.value.is_null())
        .max_by(|a, b| {
            a.trust_level
                .cmp(&b.trust_level)
                .then_with(|| a.adapter_name.cmp(&b.adapter_name))
        })
        .map(|c| c.value.clone())
}

/// List rule: append preserving arrival order, dedup by value, then sort
/// lexicographically by JSON rendering (strings dominate list fields in
/// practice, and quoting is a uniform affix so ordering matches raw string
/// order).
pub fn merge_list(contributions: &[Contribution]) -> Vec<Value> {
    let mut items = Vec::new();
    for c in contributions {
        match &c.value {
            Value::Array(arr) => items.extend(arr.iter().cloned()),
            Value::Null => {}
            other => items.push(other.clone()),
        }
    }
    let mut seen = BTreeSet::new();
    let mut deduped = Vec::new();
    for item in items {
        if seen.insert(item.to_string()) {
            deduped.push(item);
        }
    }
    deduped.sort_by(|a, b| a.to_string().cmp(&b.to_string()));
    deduped
}

/// Dict rule: union of keys, each key's values merged recursively by
/// whichever rule its own values call for.
pub fn merge_dict(contributions: &[Contribution]) -> Value {
    let mut keys = BTreeSet::new();
    for c in contributions {
        if let Value::Object(map) = &c.value {
            keys.extend(map.keys().cloned());
        }
    }

    let mut out = Map::new();
    for key in keys {
        let field_contributions: Vec<Contribution> = contributions
            .iter()
            .filter_map(|c| match &c.value {
                Value::Object(map) => map.get(&key).map(|v| Contribution {
                    adapter_name: c.adapter_name.clone(),
                    trust_level: c.trust_level,
                    value: v.clone(),
                }),
                _ => None,
            })
            .collect();
        if let Some(merged) = merge_field(&field_contributions) {
            out.insert(key, merged);
        }
    }
    Value::Object(out)
}

/// Dispatch on the contributed values' shape: any array present means list
/// rule, any object present (and no array) means dict rule, otherwise
/// scalar rule.
pub fn merge_field(contributions: &[Contribution]) -> Option<Value> {
    if contributions.is_empty() || contributions.iter().all(|c| c.value.is_null()) {
        return None;
    }
    if contributions.iter().any(|c| c.value.is_array()) {
        return Some(Value::Array(merge_list(contributions)));
    }
    if contributions.iter().any(|c| c.value.is_object()) {
        return Some(merge_dict(contributions));
    }
    merge_scalar(contributions)
}
