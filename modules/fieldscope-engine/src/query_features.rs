// Deterministic, pure feature extraction over the raw query string. Keyword
// sets are lens-supplied (`LensContract::query_keywords`) — this module
// carries no domain literals, the same purity discipline as the classifier.

use fieldscope_lens::QueryKeywords;

const GEO_PREPOSITIONS: &[&str] = &[" in ", " near ", " around ", " at "];
const PROXIMITY_MARKERS: &[&str] = &["near me", "nearby"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryFeatures {
    pub looks_like_category_search: bool,
    pub has_geo_intent: bool,
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `extract(query, lens_keywords) -> QueryFeatures`. Empty/whitespace query
/// yields both flags false.
pub fn extract(query: &str, keywords: &QueryKeywords) -> QueryFeatures {
    let normalized = normalize(query);
    if normalized.is_empty() {
        return QueryFeatures::default();
    }

    let looks_like_category_search = detect_category_search(&normalized, keywords);
    let has_geo_intent = detect_geo_intent(&normalized, keywords);

    QueryFeatures {
        looks_like_category_search,
        has_geo_intent,
    }
}

fn detect_category_search(normalized: &str, keywords: &QueryKeywords) -> bool {
    let has_specific_indicator = keywords
        .specific_indicators
        .iter()
        .any(|marker| normalized.contains(&marker.to_lowercase()));
    if has_specific_indicator {
        return false;
    }
    keywords
        .category_terms
        .iter()
        .any(|term| normalized.contains(&term.to_lowercase()))
}

fn detect_geo_intent(normalized: &str, keywords: &QueryKeywords) -> bool {
    let padded = format!(" {normalized} ");
    if GEO_PREPOSITIONS.iter().any(|p| padded.contains(p)) {
        return true;
    }
    if PROXIMITY_MARKERS.iter().any(|m| normalized.contains(m)) {
        return true;
    }
    keywords
        .location_names
        .iter()
        .any(|name| normalized.contains(&name.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> QueryKeywords {
        QueryKeywords {
            category_terms: vec!["padel".into(), "tennis".into()],
            specific_indicators: vec!["the".into()],
            location_names: vec!["edinburgh".into()],
        }
    }

    #[test]
    fn empty_query_is_all_false() {
        let f = extract("   ", &keywords());
        assert!(!f.looks_like_category_search);
        assert!(!f.has_geo_intent);
    }

    #[test]
    fn category_keyword_without_specific_marker_is_category_search() {
        let f = extract("padel courts", &keywords());
        assert!(f.looks_like_category_search);
    }

    #[test]
    fn specific_indicator_overrides_category_detection() {
        let f = extract("the padel club", &keywords());
        assert!(!f.looks_like_category_search);
    }

    #[test]
    fn geo_preposition_sets_geo_intent() {
        let f = extract("padel courts in edinburgh", &keywords());
        assert!(f.has_geo_intent);
    }

    #[test]
    fn proximity_marker_sets_geo_intent() {
        let f = extract("padel courts near me", &keywords());
        assert!(f.has_geo_intent);
    }

    #[test]
    fn lens_location_name_sets_geo_intent() {
        let f = extract("padel edinburgh", &keywords());
        assert!(f.has_geo_intent);
    }
}
