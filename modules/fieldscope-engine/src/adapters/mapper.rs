use std::collections::BTreeMap;

use fieldscope_common::Candidate;
use serde_json::Value;

use super::{AdapterKind, RawItem};

/// Per-adapter mapping from a raw item to a Candidate. A missing required
/// field (`name`) is a mapping failure: the caller increments a
/// `mapping_failures` counter and continues, it does not abort the adapter.
pub fn map_raw_item(kind: AdapterKind, source: &str, item: &RawItem) -> Option<Candidate> {
    match kind {
        AdapterKind::Serper => map_serper(source, item),
        AdapterKind::GooglePlaces => map_google_places(source, item),
        AdapterKind::OpenStreetMap => map_openstreetmap(source, item),
        AdapterKind::SportScotland => map_sport_scotland(source, item),
        AdapterKind::OsBulkRelease => map_os_bulk_release(source, item),
        AdapterKind::DomainRegistry => map_domain_registry(source, item),
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(|s| s.to_string())
}

fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key)?.as_f64()
}

fn map_serper(source: &str, item: &RawItem) -> Option<Candidate> {
    let name = str_field(&item.payload, "title")?;
    Some(Candidate {
        name,
        ids: BTreeMap::new(),
        lat: None,
        lng: None,
        address: str_field(&item.payload, "address"),
        source: source.to_string(),
        raw: item.payload.clone(),
    })
}

fn map_google_places(source: &str, item: &RawItem) -> Option<Candidate> {
    let name = str_field(&item.payload, "name")?;
    let mut ids = BTreeMap::new();
    if let Some(place_id) = str_field(&item.payload, "place_id") {
        ids.insert("google".to_string(), place_id);
    }
    Some(Candidate {
        name,
        ids,
        lat: f64_field(&item.payload, "lat"),
        lng: f64_field(&item.payload, "lng"),
        address: str_field(&item.payload, "formatted_address"),
        source: source.to_string(),
        raw: item.payload.clone(),
    })
}

fn map_openstreetmap(source: &str, item: &RawItem) -> Option<Candidate> {
    let name = str_field(&item.payload, "name")?;
    let mut ids = BTreeMap::new();
    if let Some(osm_id) = item.payload.get("osm_id").and_then(|v| v.as_i64()) {
        ids.insert("osm".to_string(), osm_id.to_string());
    }
    Some(Candidate {
        name,
        ids,
        lat: f64_field(&item.payload, "lat"),
        lng: f64_field(&item.payload, "lon"),
        address: str_field(&item.payload, "display_name"),
        source: source.to_string(),
        raw: item.payload.clone(),
    })
}

fn map_sport_scotland(source: &str, item: &RawItem) -> Option<Candidate> {
    let name = str_field(&item.payload, "facility_name")?;
    Some(Candidate {
        name,
        ids: BTreeMap::new(),
        lat: f64_field(&item.payload, "latitude"),
        lng: f64_field(&item.payload, "longitude"),
        address: str_field(&item.payload, "address"),
        source: source.to_string(),
        raw: item.payload.clone(),
    })
}

fn map_os_bulk_release(source: &str, item: &RawItem) -> Option<Candidate> {
    let name = str_field(&item.payload, "name1")?;
    Some(Candidate {
        name,
        ids: BTreeMap::new(),
        lat: f64_field(&item.payload, "geometry_y"),
        lng: f64_field(&item.payload, "geometry_x"),
        address: None,
        source: source.to_string(),
        raw: item.payload.clone(),
    })
}

fn map_domain_registry(source: &str, item: &RawItem) -> Option<Candidate> {
    let name = str_field(&item.payload, "registrant_name")?;
    let mut ids = BTreeMap::new();
    if let Some(domain) = str_field(&item.payload, "domain") {
        ids.insert("domain".to_string(), domain);
    }
    Some(Candidate {
        name,
        ids,
        lat: None,
        lng: None,
        address: str_field(&item.payload, "registrant_address"),
        source: source.to_string(),
        raw: item.payload.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn google_places_maps_strong_id_and_coords() {
        let item = RawItem {
            payload: json!({
                "name": "Oriam",
                "place_id": "ChIJ123",
                "lat": 55.9213,
                "lng": -3.1234,
                "formatted_address": "Riccarton, Edinburgh"
            }),
        };
        let c = map_raw_item(AdapterKind::GooglePlaces, "google_places", &item).unwrap();
        assert_eq!(c.name, "Oriam");
        assert_eq!(c.ids.get("google"), Some(&"ChIJ123".to_string()));
        assert_eq!(c.lat, Some(55.9213));
    }

    #[test]
    fn missing_required_field_is_mapping_failure() {
        let item = RawItem {
            payload: json!({"place_id": "ChIJ123"}),
        };
        assert!(map_raw_item(AdapterKind::GooglePlaces, "google_places", &item).is_none());
    }
}
