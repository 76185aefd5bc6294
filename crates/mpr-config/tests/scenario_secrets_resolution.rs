//! Secret resolution from env var names.
//!
//! Failure tests use sentinel var names that are never set anywhere, so no
//! test mutates the process environment.

use mpr_config::load_layered_yaml_from_strings;
use mpr_config::secrets::resolve_secrets;

#[test]
fn missing_token_errors_with_var_name() {
    let yaml = r#"
catalog:
  access_token_env: "MPR_SENTINEL_TOKEN_MISSING_Q7"
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml])
        .unwrap()
        .app_config()
        .unwrap();
    let secrets = resolve_secrets(&cfg);
    assert!(secrets.catalog_access_token.is_none());

    let msg = secrets.require_catalog_access_token().unwrap_err().to_string();
    assert!(msg.contains("SECRETS_MISSING"), "got: {msg}");
    assert!(msg.contains("MPR_SENTINEL_TOKEN_MISSING_Q7"), "got: {msg}");
}

#[test]
fn present_token_is_returned_and_debug_is_redacted() {
    // PATH is set in every test environment and stands in for a real token var.
    let yaml = r#"
catalog:
  access_token_env: "PATH"
"#;
    let cfg = load_layered_yaml_from_strings(&[yaml])
        .unwrap()
        .app_config()
        .unwrap();
    let secrets = resolve_secrets(&cfg);
    let value = secrets.require_catalog_access_token().unwrap().to_string();
    assert!(!value.is_empty());

    let dbg = format!("{secrets:?}");
    assert!(dbg.contains("<REDACTED>"), "got: {dbg}");
    assert!(!dbg.contains(&value), "debug output leaked the value");
}
