// Cross-source deduplication: three-tier exact key generation plus
// bidirectional fuzzy name matching. `accept` is the single entry point the
// orchestrator calls once per candidate after all phases complete.

use fieldscope_common::{AcceptedEntity, Candidate};
use sha1::{Digest, Sha1};

use crate::state::OrchestratorState;

const FUZZY_MATCH_THRESHOLD: f64 = 85.0;
const ARTICLES: &[&str] = &["the ", "a ", "an "];

/// Casefold, strip, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_leading_article(name: &str) -> &str {
    for article in ARTICLES {
        if let Some(rest) = name.strip_prefix(article) {
            return rest;
        }
    }
    name
}

fn round4(x: f64) -> String {
    format!("{:.4}", x)
}

/// True if a candidate is "rich": carries strong external ids or
/// coordinates. Two rich candidates are never fuzzy-merged.
fn is_rich(has_strong_ids: bool, has_coordinates: bool) -> bool {
    has_strong_ids || has_coordinates
}

/// Compute the dedup key for a candidate, trying strong ids, then geo, then
/// content hash, in that order. `seeded_ids` supplies external ids the
/// state has already recorded for this candidate's (normalized) name when
/// the candidate itself carries none.
pub fn dedup_key(candidate: &Candidate, seeded_ids: Option<&std::collections::BTreeMap<String, String>>) -> String {
    let ids = if !candidate.ids.is_empty() {
        Some(&candidate.ids)
    } else {
        seeded_ids
    };

    if let Some(ids) = ids {
        if !ids.is_empty() {
            let mut sorted: Vec<(&String, &String)> = ids.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let (kind, value) = sorted[0];
            return format!("{kind}:{value}");
        }
    }

    if let (Some(lat), Some(lng)) = (candidate.lat, candidate.lng) {
        if !candidate.name.trim().is_empty() {
            return format!("{}:{}:{}", normalize_name(&candidate.name), round4(lat), round4(lng));
        }
    }

    content_hash_key(candidate)
}

fn content_hash_key(candidate: &Candidate) -> String {
    let canonical = serde_json::json!({
        "address": candidate.address.as_ref().map(|a| normalize_name(a)),
        "name": normalize_name(&candidate.name),
        "source": candidate.source,
    });
    let bytes = serde_json::to_vec(&canonical).expect("Value serialization cannot fail");
    let digest = Sha1::digest(&bytes);
    hex::encode(digest)
}

/// Token-set-ratio style fuzzy match, 0-100 scale. Builds the intersection
/// and per-side-unique token sets, then takes the best pairwise similarity
/// among (intersection, intersection+unique_a, intersection+unique_b).
fn token_set_ratio(a: &str, b: &str) -> f64 {
    use std::collections::BTreeSet;

    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let t0 = intersection.join(" ");
    let mut t1_tokens = intersection.clone();
    t1_tokens.extend(only_a);
    let t1 = t1_tokens.join(" ");
    let mut t2_tokens = intersection.clone();
    t2_tokens.extend(only_b);
    let t2 = t2_tokens.join(" ");

    let ratio = |x: &str, y: &str| strsim::normalized_levenshtein(x, y) * 100.0;

    ratio(&t0, &t1).max(ratio(&t0, &t2)).max(ratio(&t1, &t2))
}

/// `accept(candidate, state) -> (accepted, key, reason)`.
pub fn accept(candidate: Candidate, state: &mut OrchestratorState) -> (bool, String, Option<String>) {
    let seeded = state.seeded_ids_for(&normalize_name(&candidate.name));
    let key = dedup_key(&candidate, seeded.as_ref());

    if state.accepted_entity_keys.contains(&key) {
        return (false, key, Some("duplicate".to_string()));
    }

    let candidate_is_rich = is_rich(candidate.has_strong_ids(), candidate.has_coordinates());
    let candidate_name_norm = strip_leading_article(&normalize_name(&candidate.name)).to_string();

    let mut fuzzy_match: Option<usize> = None;
    for (idx, accepted) in state.accepted_entities.iter().enumerate() {
        let accepted_is_rich = is_rich(
            accepted.candidate.has_strong_ids(),
            accepted.candidate.has_coordinates(),
        );
        if candidate_is_rich && accepted_is_rich {
            continue;
        }
        let accepted_name_norm =
            strip_leading_article(&normalize_name(&accepted.candidate.name)).to_string();
        let score = token_set_ratio(&candidate_name_norm, &accepted_name_norm);
        if score >= FUZZY_MATCH_THRESHOLD {
            fuzzy_match = Some(idx);
            break;
        }
    }

    if let Some(idx) = fuzzy_match {
        let existing_is_rich = is_rich(
            state.accepted_entities[idx].candidate.has_strong_ids(),
            state.accepted_entities[idx].candidate.has_coordinates(),
        );
        if candidate_is_rich && !existing_is_rich {
            let old_key = state.accepted_entities[idx].key.clone();
            state.accepted_entity_keys.remove(&old_key);
            state.accepted_entity_keys.insert(key.clone());
            state.accepted_entities[idx] = AcceptedEntity {
                key: key.clone(),
                candidate,
            };
            return (true, key, Some("replaced".to_string()));
        }
        let existing_key = state.accepted_entities[idx].key.clone();
        return (false, existing_key, Some("duplicate".to_string()));
    }

    state.accepted_entity_keys.insert(key.clone());
    state.accepted_entities.push(AcceptedEntity {
        key: key.clone(),
        candidate,
    });
    (true, key, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn candidate(name: &str, source: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            ids: BTreeMap::new(),
            lat: None,
            lng: None,
            address: None,
            source: source.to_string(),
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn accept_then_accept_same_is_duplicate() {
        let mut state = OrchestratorState::new();
        let c = candidate("Oriam", "serper");
        let (ok1, key1, _) = accept(c.clone(), &mut state);
        assert!(ok1);
        let (ok2, key2, reason2) = accept(c, &mut state);
        assert!(!ok2);
        assert_eq!(key1, key2);
        assert_eq!(reason2, Some("duplicate".to_string()));
    }

    #[test]
    fn cross_source_fuzzy_merge_replaces_weak_with_strong() {
        let mut state = OrchestratorState::new();
        let weak = candidate("Oriam Scotland", "serper");
        let (ok1, _, _) = accept(weak, &mut state);
        assert!(ok1);
        assert_eq!(state.accepted_entities.len(), 1);

        let mut ids = BTreeMap::new();
        ids.insert("google".to_string(), "ChIJ123".to_string());
        let strong = Candidate {
            name: "ORIAM - Scotland's Sports Performance Centre".to_string(),
            ids,
            lat: Some(55.9213),
            lng: Some(-3.1234),
            address: None,
            source: "google_places".to_string(),
            raw: serde_json::Value::Null,
        };
        let (ok2, _, reason2) = accept(strong, &mut state);
        assert!(ok2);
        assert_eq!(reason2, Some("replaced".to_string()));
        assert_eq!(state.accepted_entities.len(), 1);
        assert!(state.accepted_entities[0].candidate.has_strong_ids());
    }

    #[test]
    fn two_strong_id_entities_merge_iff_ids_match() {
        let mut state = OrchestratorState::new();
        let mut ids_a = BTreeMap::new();
        ids_a.insert("google".to_string(), "ChIJ123".to_string());
        let a = Candidate {
            ids: ids_a,
            ..candidate("Place A", "google_places")
        };
        let mut ids_b = BTreeMap::new();
        ids_b.insert("google".to_string(), "ChIJ123".to_string());
        let b = Candidate {
            ids: ids_b,
            ..candidate("Place A Renamed", "google_places")
        };
        accept(a, &mut state);
        let (ok, _, reason) = accept(b, &mut state);
        assert!(!ok);
        assert_eq!(reason, Some("duplicate".to_string()));
        assert_eq!(state.accepted_entities.len(), 1);
    }

    #[test]
    fn lat_zero_lng_zero_uses_geo_tier_not_content_hash() {
        let candidate_a = Candidate {
            lat: Some(0.0),
            lng: Some(0.0),
            ..candidate("Null Island Kiosk", "serper")
        };
        let key = dedup_key(&candidate_a, None);
        assert!(key.contains("0.0000"));
    }
}
