use mpr_config::{
    load_layered_yaml_from_strings, report_unused_keys, ConfigConsumer, UnusedKeyPolicy,
};

const YAML: &str = r#"
daemon:
  addr: "127.0.0.1:8899"
catalog:
  endpoint: "https://shop.example.com"
pricing:
  currency: "EUR"
legacy:
  shop_domain: "old.example.com"
  poll_secs: 30
"#;

#[test]
fn warn_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report =
        report_unused_keys(ConfigConsumer::Daemon, &loaded.config_json, UnusedKeyPolicy::Warn)
            .unwrap();

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/legacy/poll_secs".to_string(),
            "/legacy/shop_domain".to_string()
        ]
    );
}

#[test]
fn fail_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err =
        report_unused_keys(ConfigConsumer::Daemon, &loaded.config_json, UnusedKeyPolicy::Fail)
            .unwrap_err()
            .to_string();
    assert!(err.contains("CONFIG_UNUSED_KEYS"), "got: {err}");
    assert!(err.contains("consumer=DAEMON"), "got: {err}");
}

#[test]
fn cli_does_not_consume_daemon_addr() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report =
        report_unused_keys(ConfigConsumer::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)
            .unwrap();
    assert!(report
        .unused_leaf_pointers
        .contains(&"/daemon/addr".to_string()));
}

#[test]
fn fully_consumed_config_is_clean() {
    let yaml = r#"
catalog:
  endpoint: "https://shop.example.com"
  access_token_env: "MPR_CATALOG_ACCESS_TOKEN"
  api_version: "2024-10"
reconcile:
  max_transport_retries: 1
pricing:
  currency: "USD"
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report =
        report_unused_keys(ConfigConsumer::Cli, &loaded.config_json, UnusedKeyPolicy::Fail)
            .unwrap();
    assert!(report.is_clean());
}
