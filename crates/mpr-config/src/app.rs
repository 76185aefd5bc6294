use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comma-separated list of YAML layers, base first.
pub const ENV_CONFIG_PATHS: &str = "MPR_CONFIG";
/// Overrides `daemon.addr`.
pub const ENV_DAEMON_ADDR: &str = "MPR_DAEMON_ADDR";

/// Typed view of the merged config. Every key has a default so an empty
/// layer set produces a usable (catalog-less) config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub daemon: DaemonConfig,
    pub catalog: CatalogConfig,
    pub reconcile: ReconcileConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub addr: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8899".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Store base URL, e.g. `https://example.myshopify.com`.
    pub endpoint: Option<String>,
    /// NAME of the env var that holds the admin access token.
    pub access_token_env: String,
    pub api_version: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_token_env: "MPR_CATALOG_ACCESS_TOKEN".to_string(),
            api_version: "2024-10".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Extra attempts for transport-level catalog failures. 0 disables retry.
    pub max_transport_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency recorded with spot prices entered without one.
    pub currency: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let mut cfg: AppConfig =
            serde_json::from_value(config_json.clone()).context("config has invalid shape")?;
        if let Some(ep) = cfg.catalog.endpoint.as_mut() {
            let trimmed = ep.trim().trim_end_matches('/').to_string();
            *ep = trimmed;
        }
        if cfg.catalog.endpoint.as_deref() == Some("") {
            cfg.catalog.endpoint = None;
        }
        Ok(cfg)
    }

    /// Apply process-level overrides. `lookup` is `std::env::var` in binaries.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ENV_DAEMON_ADDR).filter(|s| !s.trim().is_empty()) {
            self.daemon.addr = addr.trim().to_string();
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|k| std::env::var(k).ok());
    }
}

/// Config layer paths from `MPR_CONFIG`, in order. Empty when unset.
pub fn config_paths_from_env() -> Vec<String> {
    std::env::var(ENV_CONFIG_PATHS)
        .map(|raw| split_paths(&raw))
        .unwrap_or_default()
}

fn split_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AppConfig::from_config_json(&serde_json::json!({})).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.daemon.addr, "127.0.0.1:8899");
        assert_eq!(cfg.pricing.currency, "USD");
        assert_eq!(cfg.reconcile.max_transport_retries, 0);
        assert!(cfg.catalog.endpoint.is_none());
    }

    #[test]
    fn endpoint_is_trimmed_and_blank_means_unset() {
        let cfg = AppConfig::from_config_json(&serde_json::json!({
            "catalog": {"endpoint": " https://shop.example.com/ "}
        }))
        .unwrap();
        assert_eq!(
            cfg.catalog.endpoint.as_deref(),
            Some("https://shop.example.com")
        );

        let blank = AppConfig::from_config_json(&serde_json::json!({
            "catalog": {"endpoint": "  "}
        }))
        .unwrap();
        assert!(blank.catalog.endpoint.is_none());
    }

    #[test]
    fn wrong_type_is_an_error() {
        let err = AppConfig::from_config_json(&serde_json::json!({
            "reconcile": {"max_transport_retries": "lots"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("invalid shape"));
    }

    #[test]
    fn daemon_addr_override() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| (k == ENV_DAEMON_ADDR).then(|| "0.0.0.0:9000".to_string()));
        assert_eq!(cfg.daemon.addr, "0.0.0.0:9000");

        let mut untouched = AppConfig::default();
        untouched.apply_overrides(|_| Some("   ".to_string()));
        assert_eq!(untouched.daemon.addr, "127.0.0.1:8899");
    }

    #[test]
    fn config_paths_split_on_commas() {
        assert_eq!(
            split_paths("config/base.yaml, config/prod.yaml,,"),
            vec!["config/base.yaml".to_string(), "config/prod.yaml".to_string()]
        );
        assert!(split_paths("").is_empty());
    }
}
