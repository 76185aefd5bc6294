//! Axum router and all HTTP handlers for mpr-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers so tests can use the bare router.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use mpr_reconcile::{load_spot_snapshot, run_reconciliation_with_id, PipelineError, StoreError};
use mpr_schemas::{GoldPurity, Metal, NewSpotPrice, SpotBucket};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, OwnedMutexGuard};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        ErrorResponse, FailureResponse, FormulasResponse, HealthResponse,
        LatestSpotPricesResponse, RecalculateResponse, RecordSpotPricesRequest,
        RecordSpotPricesResponse, SetActiveFormulaRequest, SetActiveFormulaResponse,
        SpotBucketPrice, SpotPriceInput, StatusResponse, VariantConfigQuery,
        VariantConfigResponse, VariantConfigWrite, VariantConfigWriteResponse,
    },
    state::{AppState, BusMsg},
};

const RUN_IN_PROGRESS: &str = "a reconciliation run is already in progress";
const RUN_FAILED: &str = "Failed to calculate prices";
const MISSING_ITEM_ID: &str = "Missing itemId";
const INTERNAL: &str = "internal error";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/prices/recalculate", post(recalculate))
        .route(
            "/v1/variant-config",
            get(get_variant_config).post(upsert_variant_config),
        )
        .route("/v1/formulas", get(list_formulas))
        .route("/v1/formulas/active", post(set_active_formula))
        .route("/v1/spot-prices/latest", get(latest_spot_prices))
        .route("/v1/spot-prices", post(record_spot_prices))
        .with_state(state)
}

/// Log a store failure and hide its detail from the client.
fn store_failure(op: &'static str, e: StoreError) -> Response {
    error!(op, error = %e, "store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(FailureResponse::new(INTERNAL)),
    )
        .into_response()
}

fn bad_request(msg: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(FailureResponse::new(msg))).into_response()
}

fn missing_item_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: MISSING_ITEM_ID.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/health  GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let s = st.status.read().await.clone();
    (
        StatusCode::OK,
        Json(StatusResponse {
            daemon_uptime_secs: st.uptime_secs(),
            run_in_progress: s.active_run_id.is_some(),
            active_run_id: s.active_run_id,
            last_run: s.last_run,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/prices/recalculate
// ---------------------------------------------------------------------------

/// Run one reconciliation to completion and report its summary.
///
/// At most one run per daemon: a second trigger while a run holds the guard
/// gets `409` without touching any port. The run executes in its own task, so
/// a caller that disconnects does not cut it short.
pub(crate) async fn recalculate(State(st): State<Arc<AppState>>) -> Response {
    let Some(guard) = st.try_begin_run() else {
        warn!("recalculate refused: run in progress");
        return (
            StatusCode::CONFLICT,
            Json(FailureResponse::new(RUN_IN_PROGRESS)),
        )
            .into_response();
    };

    let run_id = Uuid::new_v4();
    let task = tokio::spawn(execute_run(Arc::clone(&st), run_id, guard));
    match task.await {
        Ok(resp) => resp,
        Err(e) => {
            error!(%run_id, error = %e, "reconciliation task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureResponse::new(RUN_FAILED)),
            )
                .into_response()
        }
    }
}

/// Body of a triggered run. Owns the run slot until the status and bus have
/// been updated.
async fn execute_run(st: Arc<AppState>, run_id: Uuid, _guard: OwnedMutexGuard<()>) -> Response {
    st.status.write().await.active_run_id = Some(run_id);
    st.publish(BusMsg::RunStarted { run_id });
    info!(%run_id, "recalculate started");

    let result = run_reconciliation_with_id(run_id, st.ports.reconcile(), &st.reconcile_opts).await;

    let mut s = st.status.write().await;
    s.active_run_id = None;
    match result {
        Ok(run) => {
            s.last_run = Some(run.summary.clone());
            drop(s);
            st.publish(BusMsg::RunFinished {
                run_id,
                summary: Some(run.summary.clone()),
                error: None,
            });
            (
                StatusCode::OK,
                Json(RecalculateResponse::from(run.summary)),
            )
                .into_response()
        }
        Err(PipelineError::Precondition(p)) => {
            drop(s);
            let msg = p.to_string();
            st.publish(BusMsg::RunFinished {
                run_id,
                summary: None,
                error: Some(msg.clone()),
            });
            st.publish(BusMsg::LogLine {
                level: "WARN".to_string(),
                msg: msg.clone(),
            });
            bad_request(msg)
        }
        Err(PipelineError::Unexpected(_)) => {
            drop(s);
            // Detail was logged inside the run span.
            st.publish(BusMsg::RunFinished {
                run_id,
                summary: None,
                error: Some(RUN_FAILED.to_string()),
            });
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FailureResponse::new(RUN_FAILED)),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET|POST /v1/variant-config
// ---------------------------------------------------------------------------

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub(crate) async fn get_variant_config(
    State(st): State<Arc<AppState>>,
    Query(q): Query<VariantConfigQuery>,
) -> Response {
    let Some(item_id) = non_blank(q.item_id) else {
        return missing_item_id();
    };
    match st.ports.configs.get_by_item_id(&item_id).await {
        Ok(config) => (StatusCode::OK, Json(VariantConfigResponse { config })).into_response(),
        Err(e) => store_failure("get_variant_config", e),
    }
}

pub(crate) async fn upsert_variant_config(
    State(st): State<Arc<AppState>>,
    Json(body): Json<VariantConfigWrite>,
) -> Response {
    let Some(item_id) = non_blank(body.item_id) else {
        return missing_item_id();
    };
    match st.ports.configs.upsert(&item_id, body.fields).await {
        Ok(config) => {
            info!(item_id = %config.item_id, "variant config saved");
            (
                StatusCode::OK,
                Json(VariantConfigWriteResponse {
                    config,
                    success: true,
                }),
            )
                .into_response()
        }
        Err(e) => store_failure("upsert_variant_config", e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/formulas  POST /v1/formulas/active
// ---------------------------------------------------------------------------

pub(crate) async fn list_formulas(State(st): State<Arc<AppState>>) -> Response {
    let formulas = match st.ports.formulas.list_all().await {
        Ok(f) => f,
        Err(e) => return store_failure("list_formulas", e),
    };
    let active = formulas.iter().find(|f| f.is_active).cloned();
    (StatusCode::OK, Json(FormulasResponse { formulas, active })).into_response()
}

pub(crate) async fn set_active_formula(
    State(st): State<Arc<AppState>>,
    Json(body): Json<SetActiveFormulaRequest>,
) -> Response {
    match st.ports.formulas.set_active(body.id).await {
        Ok(active) => {
            info!(formula = %active.code, id = active.id, "active formula switched");
            st.publish(BusMsg::LogLine {
                level: "INFO".to_string(),
                msg: format!("active formula is now {}", active.code),
            });
            (
                StatusCode::OK,
                Json(SetActiveFormulaResponse {
                    success: true,
                    active,
                }),
            )
                .into_response()
        }
        Err(e @ StoreError::FormulaNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(FailureResponse::new(e.to_string())),
        )
            .into_response(),
        Err(e) => store_failure("set_active_formula", e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/spot-prices/latest  POST /v1/spot-prices
// ---------------------------------------------------------------------------

pub(crate) async fn latest_spot_prices(State(st): State<Arc<AppState>>) -> Response {
    let snapshot = match load_spot_snapshot(st.ports.spot.as_ref()).await {
        Ok(s) => s,
        Err(e) => return store_failure("latest_spot_prices", e),
    };
    let prices = SpotBucket::ALL
        .into_iter()
        .map(|b| SpotBucketPrice {
            key: b.key().to_string(),
            metal: b.metal().as_str().to_string(),
            purity: b.purity().map(|p| p.as_str().to_string()),
            price: snapshot.price(b),
        })
        .collect();
    (StatusCode::OK, Json(LatestSpotPricesResponse { prices })).into_response()
}

fn to_new_spot_price(
    idx: usize,
    input: SpotPriceInput,
    default_currency: &str,
) -> Result<NewSpotPrice, String> {
    let metal = Metal::parse(&input.metal)
        .ok_or_else(|| format!("prices[{idx}]: unknown metal '{}'", input.metal))?;
    let purity = match non_blank(input.purity) {
        Some(p) => Some(
            GoldPurity::parse(&p).ok_or_else(|| format!("prices[{idx}]: unknown purity '{p}'"))?,
        ),
        None => None,
    };
    let bucket = SpotBucket::from_parts(metal, purity).ok_or_else(|| {
        format!("prices[{idx}]: purity is required for gold and not allowed otherwise")
    })?;
    if input.price < Decimal::ZERO {
        return Err(format!("prices[{idx}]: negative price {}", input.price));
    }
    Ok(NewSpotPrice {
        bucket,
        price: input.price,
        currency: non_blank(input.currency).unwrap_or_else(|| default_currency.to_string()),
        captured_at: input.captured_at,
    })
}

/// Append observations. The whole body is validated first, then written as
/// one batch.
pub(crate) async fn record_spot_prices(
    State(st): State<Arc<AppState>>,
    Json(body): Json<RecordSpotPricesRequest>,
) -> Response {
    if body.prices.is_empty() {
        return bad_request("prices is empty");
    }
    let mut rows = Vec::with_capacity(body.prices.len());
    for (idx, input) in body.prices.into_iter().enumerate() {
        match to_new_spot_price(idx, input, &st.default_currency) {
            Ok(row) => rows.push(row),
            Err(msg) => return bad_request(msg),
        }
    }

    let saved = match st.ports.spot.record_all(rows).await {
        Ok(saved) => saved,
        Err(e @ StoreError::InvalidSpotPrice(_)) => return bad_request(e.to_string()),
        Err(e) => return store_failure("record_spot_prices", e),
    };
    for row in &saved {
        info!(bucket = row.metal.as_str(), price = %row.price, "spot price recorded");
    }
    let recorded = saved.len();

    (
        StatusCode::OK,
        Json(RecordSpotPricesResponse {
            success: true,
            recorded,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
