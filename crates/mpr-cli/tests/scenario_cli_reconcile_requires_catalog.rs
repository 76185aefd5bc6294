//! `mpr reconcile run` refuses to start without a catalog endpoint or token,
//! before touching the database.

use assert_cmd::Command;
use predicates::prelude::*;

fn mpr(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mpr").unwrap();
    // Fresh cwd: no .env.local is picked up.
    cmd.current_dir(dir.path())
        .env_remove("MPR_CONFIG")
        .env_remove("MPR_DATABASE_URL")
        .env_remove("MPR_CATALOG_ACCESS_TOKEN");
    cmd
}

#[test]
fn missing_endpoint_fails_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    mpr(&dir)
        .args(["reconcile", "run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_MISSING: catalog.endpoint"));
}

#[test]
fn missing_token_names_the_env_var_not_a_value() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("shop.yaml");
    std::fs::write(
        &cfg,
        "catalog:\n  endpoint: \"https://shop.example.com\"\n  access_token_env: \"MPR_TEST_TOKEN_THAT_IS_NEVER_SET\"\n",
    )
    .unwrap();

    mpr(&dir)
        .args(["--config", cfg.to_str().unwrap(), "reconcile", "run"])
        .env_remove("MPR_TEST_TOKEN_THAT_IS_NEVER_SET")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "SECRETS_MISSING: required env var 'MPR_TEST_TOKEN_THAT_IS_NEVER_SET'",
        ));
}

#[test]
fn db_commands_name_the_missing_database_url() {
    let dir = tempfile::tempdir().unwrap();
    mpr(&dir)
        .args(["formula", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("MPR_DATABASE_URL"));
}
