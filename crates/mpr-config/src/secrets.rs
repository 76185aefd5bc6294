//! Runtime secret resolution.
//!
//! Config YAML stores only env var NAMES (`catalog.access_token_env`).
//! Binaries call [`resolve_secrets`] once at startup and pass the result to
//! constructors. `Debug` redacts values and errors name the variable, never
//! its contents.

use anyhow::{bail, Result};

use crate::AppConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Catalog admin access token. `None` if the named env var was absent or empty.
    pub catalog_access_token: Option<String>,
    catalog_access_token_var: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "catalog_access_token",
                &self.catalog_access_token.as_ref().map(|_| "<REDACTED>"),
            )
            .field("catalog_access_token_var", &self.catalog_access_token_var)
            .finish()
    }
}

impl ResolvedSecrets {
    /// The token, or an error naming the env var that should hold it.
    pub fn require_catalog_access_token(&self) -> Result<&str> {
        match self.catalog_access_token.as_deref() {
            Some(t) => Ok(t),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (catalog access token) is not set or empty",
                self.catalog_access_token_var
            ),
        }
    }
}

/// Unset and blank both count as missing.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Read every secret named by `cfg`. Missing secrets are not an error here;
/// callers that need one use the `require_*` accessors.
pub fn resolve_secrets(cfg: &AppConfig) -> ResolvedSecrets {
    let var = cfg.catalog.access_token_env.trim().to_string();
    ResolvedSecrets {
        catalog_access_token: resolve_env(&var),
        catalog_access_token_var: var,
    }
}
