use std::path::Path;

use fieldscope_lens::LensContract;

#[test]
fn padel_fixture_loads_and_validates() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("lenses");
    let contract = LensContract::load("padel", &path, &["sport_scotland"]).unwrap();

    assert_eq!(contract.lens_id, "padel");
    assert!(!contract.is_empty_contract());
    assert_eq!(contract.facet_for_value("padel"), Some("activity"));
    assert_eq!(contract.mapping_rules().len(), 3);
    assert_eq!(contract.module_triggers().len(), 2);
    assert!(contract.modules().contains_key("sports_facility"));
}

#[test]
fn padel_fixture_rejects_unregistered_connector() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("lenses");
    let result = LensContract::load("padel", &path, &[]);
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("gate 6"));
}
