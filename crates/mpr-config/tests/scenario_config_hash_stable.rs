//! Config hash stability.
//!
//! - same inputs hash identically
//! - key order inside a document does not change the hash
//! - different values hash differently
//! - later layers override earlier ones

use mpr_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
daemon:
  addr: "127.0.0.1:8899"
catalog:
  endpoint: "https://shop.example.com"
  access_token_env: "MPR_CATALOG_ACCESS_TOKEN"
  api_version: "2024-10"
pricing:
  currency: "USD"
"#;

const BASE_YAML_REORDERED: &str = r#"
pricing:
  currency: "USD"
catalog:
  api_version: "2024-10"
  access_token_env: "MPR_CATALOG_ACCESS_TOKEN"
  endpoint: "https://shop.example.com"
daemon:
  addr: "127.0.0.1:8899"
"#;

const PROD_OVERLAY: &str = r#"
catalog:
  api_version: "2025-01"
reconcile:
  max_transport_retries: 2
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex digest");
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE_YAML, PROD_OVERLAY]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);
}

#[test]
fn overlay_overrides_leaf_and_keeps_siblings() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, PROD_OVERLAY]).unwrap();
    let cfg = loaded.app_config().unwrap();
    assert_eq!(cfg.catalog.api_version, "2025-01");
    assert_eq!(
        cfg.catalog.endpoint.as_deref(),
        Some("https://shop.example.com")
    );
    assert_eq!(cfg.reconcile.max_transport_retries, 2);
    assert_eq!(cfg.daemon.addr, "127.0.0.1:8899");
}

#[test]
fn empty_layer_is_a_no_op() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let with_empty = load_layered_yaml_from_strings(&[BASE_YAML, ""]).unwrap();
    assert_eq!(base.config_hash, with_empty.config_hash);
}

#[test]
fn files_load_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let prod = dir.path().join("prod.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&prod, PROD_OVERLAY).unwrap();

    let paths = [
        base.to_string_lossy().to_string(),
        prod.to_string_lossy().to_string(),
    ];
    let from_files = mpr_config::load_layered_yaml(&paths).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, PROD_OVERLAY]).unwrap();
    assert_eq!(from_files.config_hash, from_strings.config_hash);

    let missing = mpr_config::load_layered_yaml(&["/definitely/not/here.yaml"]);
    assert!(missing
        .unwrap_err()
        .to_string()
        .contains("failed to read yaml path"));
}
