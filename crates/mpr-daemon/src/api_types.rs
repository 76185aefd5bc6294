//! Request and response types for all mpr-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use chrono::{DateTime, Utc};
use mpr_schemas::{BatchRunSummary, FormulaVariant, VariantConfig, VariantConfigFields};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// /v1/health  /v1/status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub daemon_uptime_secs: u64,
    pub run_in_progress: bool,
    pub active_run_id: Option<Uuid>,
    pub last_run: Option<BatchRunSummary>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// `{success:false, error}` body used by the trigger and write routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
}

impl FailureResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Bare `{error}` body for request validation on the config routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/prices/recalculate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculateResponse {
    pub success: bool,
    pub run_id: Uuid,
    pub results: RunResults,
    pub formula_used: String,
    pub total_processed: usize,
    pub timestamp: DateTime<Utc>,
}

impl From<BatchRunSummary> for RecalculateResponse {
    fn from(s: BatchRunSummary) -> Self {
        Self {
            success: true,
            run_id: s.run_id,
            results: RunResults {
                success: s.success_count,
                failed: s.failed_count,
                errors: s.errors,
            },
            formula_used: s.formula_used,
            total_processed: s.total_processed,
            timestamp: s.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// /v1/variant-config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantConfigQuery {
    #[serde(rename = "itemId")]
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfigResponse {
    pub config: Option<VariantConfig>,
}

/// Write body: `itemId` plus the full field set. Omitted fields become NULL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantConfigWrite {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(flatten)]
    pub fields: VariantConfigFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfigWriteResponse {
    pub config: VariantConfig,
    pub success: bool,
}

// ---------------------------------------------------------------------------
// /v1/formulas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulasResponse {
    pub formulas: Vec<FormulaVariant>,
    pub active: Option<FormulaVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveFormulaRequest {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetActiveFormulaResponse {
    pub success: bool,
    pub active: FormulaVariant,
}

// ---------------------------------------------------------------------------
// /v1/spot-prices
// ---------------------------------------------------------------------------

/// One bucket of the current snapshot. `price` is 0 when never recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotBucketPrice {
    pub key: String,
    pub metal: String,
    pub purity: Option<String>,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestSpotPricesResponse {
    pub prices: Vec<SpotBucketPrice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPriceInput {
    pub metal: String,
    #[serde(default)]
    pub purity: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSpotPricesRequest {
    pub prices: Vec<SpotPriceInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSpotPricesResponse {
    pub success: bool,
    pub recorded: usize,
}
