//! Command handler modules for mpr-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod formula;
pub mod reconcile;
pub mod spot;
pub mod variant;

use anyhow::{Context, Result};
use mpr_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, AppConfig, ConfigConsumer,
    UnusedKeyPolicy,
};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Layers from `--config`, else `MPR_CONFIG`, then env overrides. An empty
/// layer set yields defaults.
pub fn load_app_config(config_paths: &[String]) -> Result<AppConfig> {
    let paths = if config_paths.is_empty() {
        config_paths_from_env()
    } else {
        config_paths.to_vec()
    };
    let loaded = load_layered_yaml(&paths)?;
    tracing::debug!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");

    let report = report_unused_keys(
        ConfigConsumer::Cli,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        eprintln!(
            "WARN: CONFIG_UNUSED_KEYS consumer={} unused_leaf_keys={}",
            report.consumer,
            report.unused_leaf_pointers.len()
        );
        for p in report.unused_leaf_pointers.iter().take(50) {
            eprintln!("  unused={}", p);
        }
    }

    let mut cfg = loaded.app_config()?;
    cfg.apply_env_overrides();
    Ok(cfg)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize output failed")?;
    println!("{s}");
    Ok(())
}
