//! `mpr price explain` and `mpr reconcile run`.

use anyhow::{bail, Context, Result};
use mpr_catalog::GraphqlCatalogClient;
use mpr_config::secrets::resolve_secrets;
use mpr_db::PgStore;
use mpr_reconcile::{explain_item, run_reconciliation, ReconcileOptions, ReconcilePorts};

use super::{load_app_config, print_json};

pub async fn price_explain(item_id: &str) -> Result<()> {
    let pool = mpr_db::connect_from_env().await?;
    let store = PgStore::new(pool);
    match explain_item(&store, &store, &store, item_id.trim()).await? {
        Some(trace) => print_json(&trace),
        None => bail!("no variant config for item '{}'", item_id.trim()),
    }
}

/// Runs against the real catalog. The summary is printed even when some
/// items failed; only an aborted run exits non-zero.
pub async fn reconcile_run(config_paths: &[String]) -> Result<()> {
    let cfg = load_app_config(config_paths)?;
    let secrets = resolve_secrets(&cfg);

    let endpoint = cfg
        .catalog
        .endpoint
        .as_deref()
        .context("CONFIG_MISSING: catalog.endpoint is required for reconcile run")?;
    let catalog = GraphqlCatalogClient::new(
        endpoint,
        &cfg.catalog.api_version,
        secrets.require_catalog_access_token()?.to_string(),
    )?;

    let pool = mpr_db::connect_from_env().await?;
    let store = PgStore::new(pool);
    let ports = ReconcilePorts {
        spot: &store,
        configs: &store,
        formulas: &store,
        catalog: &catalog,
    };
    let opts = ReconcileOptions {
        max_transport_retries: cfg.reconcile.max_transport_retries,
    };

    let run = run_reconciliation(ports, &opts).await?;
    print_json(&run.summary)
}
