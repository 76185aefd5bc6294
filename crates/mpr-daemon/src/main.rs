//! mpr-daemon entry point.
//!
//! Loads config, connects to Postgres, builds the catalog client, wires
//! middleware, and starts the HTTP server. Route handlers live in
//! `routes.rs`; shared state lives in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use mpr_catalog::GraphqlCatalogClient;
use mpr_config::secrets::resolve_secrets;
use mpr_config::{
    config_paths_from_env, load_layered_yaml, report_unused_keys, AppConfig, ConfigConsumer,
    UnusedKeyPolicy,
};
use mpr_daemon::{
    routes,
    state::{self, DaemonPorts},
};
use mpr_db::PgStore;
use mpr_reconcile::ReconcileOptions;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Production injects env
    // vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cfg = load_config()?;
    let secrets = resolve_secrets(&cfg);

    // Boot fails closed: no catalog, no daemon.
    let endpoint = cfg
        .catalog
        .endpoint
        .as_deref()
        .context("CONFIG_MISSING: catalog.endpoint is required by mpr-daemon")?;
    let catalog = GraphqlCatalogClient::new(
        endpoint,
        &cfg.catalog.api_version,
        secrets.require_catalog_access_token()?.to_string(),
    )?;
    info!(graphql_url = catalog.graphql_url(), "catalog client ready");

    let pool = mpr_db::connect_from_env().await?;
    mpr_db::migrate(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let ports = DaemonPorts {
        spot: store.clone(),
        configs: store.clone(),
        formulas: store,
        catalog: Arc::new(catalog),
    };
    let opts = ReconcileOptions {
        max_transport_retries: cfg.reconcile.max_transport_retries,
    };
    let shared = Arc::new(state::AppState::new(ports, opts, &cfg.pricing.currency));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr: SocketAddr = cfg
        .daemon
        .addr
        .parse()
        .with_context(|| format!("invalid daemon.addr '{}'", cfg.daemon.addr))?;
    info!("mpr-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Layers from `MPR_CONFIG`, then env overrides. Unused keys only warn.
fn load_config() -> Result<AppConfig> {
    let paths = config_paths_from_env();
    let loaded = load_layered_yaml(&paths)?;
    info!(config_hash = %loaded.config_hash, layers = paths.len(), "config loaded");

    let report = report_unused_keys(
        ConfigConsumer::Daemon,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )?;
    if !report.is_clean() {
        warn!(unused = ?report.unused_leaf_pointers, "config has keys mpr-daemon does not read");
    }

    let mut cfg = loaded.app_config()?;
    cfg.apply_env_overrides();
    Ok(cfg)
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}
