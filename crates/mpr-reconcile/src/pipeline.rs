use std::future::Future;

use chrono::Utc;
use mpr_pricing::{calculate_price, calculate_with_trace, PriceTrace, SpotSnapshot};
use mpr_schemas::{
    BatchRunSummary, CalculationResult, FormulaCode, ItemOutcome, SpotBucket, VariantConfig,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::ports::{
    CatalogError, CatalogSyncClient, FormulaRegistry, SpotPriceRepository, StoreError,
    VariantConfigStore,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Borrowed handles to every port a run touches.
#[derive(Clone, Copy)]
pub struct ReconcilePorts<'a> {
    pub spot: &'a dyn SpotPriceRepository,
    pub configs: &'a dyn VariantConfigStore,
    pub formulas: &'a dyn FormulaRegistry,
    pub catalog: &'a dyn CatalogSyncClient,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Extra attempts per catalog call for transport-class failures only.
    pub max_transport_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRun {
    pub summary: BatchRunSummary,
    /// One entry per configured item, in processing order.
    pub items: Vec<CalculationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("No active formula found. Please set a formula in settings.")]
    NoActiveFormula,
    #[error("No configured items found. Please configure at least one item.")]
    NoConfiguredItems,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The run never started; nothing was sent to the catalog.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    /// Snapshot or load phase failed. Detail is for logs, not for clients.
    #[error("reconciliation aborted: {0:#}")]
    Unexpected(anyhow::Error),
}

impl PipelineError {
    fn unexpected(what: &'static str) -> impl FnOnce(StoreError) -> PipelineError {
        move |e| PipelineError::Unexpected(anyhow::Error::new(e).context(what))
    }
}

/// Running success/failure counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTally {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl RunTally {
    pub fn record(&mut self, result: &CalculationResult) {
        if result.outcome.is_success() {
            self.success += 1;
        } else {
            self.failed += 1;
            if let Some(detail) = &result.error_detail {
                self.errors.push(detail.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Latest price of each of the seven buckets. Buckets with no observation
/// are left out and read as zero.
pub async fn load_spot_snapshot(
    repo: &dyn SpotPriceRepository,
) -> Result<SpotSnapshot, StoreError> {
    let mut snapshot = SpotSnapshot::new();
    for bucket in SpotBucket::ALL {
        if let Some(quote) = repo.latest(bucket.metal(), bucket.purity()).await? {
            snapshot.set(bucket, quote.price);
        }
    }
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub async fn run_reconciliation(
    ports: ReconcilePorts<'_>,
    opts: &ReconcileOptions,
) -> Result<ReconcileRun, PipelineError> {
    run_reconciliation_with_id(Uuid::new_v4(), ports, opts).await
}

/// Same as [`run_reconciliation`] with a caller-chosen run id, so the caller
/// can announce the run before it finishes.
pub async fn run_reconciliation_with_id(
    run_id: Uuid,
    ports: ReconcilePorts<'_>,
    opts: &ReconcileOptions,
) -> Result<ReconcileRun, PipelineError> {
    let span = info_span!("reconcile", %run_id);
    let result = execute(run_id, ports, opts).instrument(span.clone()).await;
    if let Err(PipelineError::Unexpected(e)) = &result {
        span.in_scope(|| error!(error = %format!("{e:#}"), "reconciliation run aborted"));
    }
    result
}

async fn execute(
    run_id: Uuid,
    ports: ReconcilePorts<'_>,
    opts: &ReconcileOptions,
) -> Result<ReconcileRun, PipelineError> {
    let active = ports
        .formulas
        .get_active()
        .await
        .map_err(PipelineError::unexpected("load active formula"))?
        .ok_or(PreconditionError::NoActiveFormula)?;
    let code = active.formula_code();

    let configs = ports
        .configs
        .list_all()
        .await
        .map_err(PipelineError::unexpected("load variant configs"))?;
    if configs.is_empty() {
        return Err(PreconditionError::NoConfiguredItems.into());
    }

    let snapshot = load_spot_snapshot(ports.spot)
        .await
        .map_err(PipelineError::unexpected("load spot snapshot"))?;

    info!(
        formula = %code,
        items = configs.len(),
        catalog = ports.catalog.name(),
        "reconciliation run started"
    );

    let mut tally = RunTally::default();
    let mut items = Vec::with_capacity(configs.len());
    for config in &configs {
        let result = process_item(config, &code, &snapshot, ports.catalog, opts).await;
        if !result.outcome.is_success() {
            warn!(
                item_id = %result.item_id,
                outcome = ?result.outcome,
                detail = result.error_detail.as_deref().unwrap_or(""),
                "item not updated"
            );
        }
        tally.record(&result);
        items.push(result);
    }

    let summary = BatchRunSummary {
        run_id,
        success_count: tally.success,
        failed_count: tally.failed,
        errors: tally.errors,
        formula_used: active.code.clone(),
        total_processed: configs.len(),
        timestamp: Utc::now(),
    };
    info!(
        success = summary.success_count,
        failed = summary.failed_count,
        "reconciliation run finished"
    );

    Ok(ReconcileRun { summary, items })
}

async fn process_item(
    config: &VariantConfig,
    code: &FormulaCode,
    snapshot: &SpotSnapshot,
    catalog: &dyn CatalogSyncClient,
    opts: &ReconcileOptions,
) -> CalculationResult {
    let item_id = config.item_id.as_str();
    let price = calculate_price(code, &config.fields, snapshot);
    let result = |outcome: ItemOutcome, detail: Option<String>| CalculationResult {
        item_id: item_id.to_string(),
        computed_price: price,
        outcome,
        error_detail: detail,
    };

    if price <= Decimal::ZERO {
        return result(
            ItemOutcome::Invalid,
            Some(format!("Invalid calculated price for item {item_id}: {price}")),
        );
    }

    let retries = opts.max_transport_retries;
    let parent_id = match with_transport_retry(retries, "resolve_parent", item_id, || {
        catalog.resolve_parent(item_id)
    })
    .await
    {
        Ok(p) => p,
        Err(e) => {
            return result(
                ItemOutcome::ResolutionFailed,
                Some(format!("Error resolving parent for item {item_id}: {e}")),
            )
        }
    };

    match with_transport_retry(retries, "submit_price", item_id, || {
        catalog.submit_price(&parent_id, item_id, price)
    })
    .await
    {
        Err(e) => result(
            ItemOutcome::SubmissionFailed,
            Some(format!("Error submitting price for item {item_id}: {e}")),
        ),
        Ok(outcome) => match outcome.validation_errors.first() {
            Some(first) => result(
                ItemOutcome::SubmissionFailed,
                Some(format!("Catalog error for item {item_id}: {first}")),
            ),
            None => result(ItemOutcome::Success, None),
        },
    }
}

/// Run `op`, retrying up to `max_retries` extra times while it fails with a
/// transport-class error.
async fn with_transport_retry<T, F, Fut>(
    max_retries: u32,
    op: &'static str,
    item_id: &str,
    mut call: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match call().await {
            Err(e) if e.is_transport() && attempt < max_retries => {
                attempt += 1;
                warn!(op, item_id, attempt, error = %e, "retrying catalog call");
            }
            other => return other,
        }
    }
}

// ---------------------------------------------------------------------------
// Explain
// ---------------------------------------------------------------------------

/// Price one configured item with the active formula and current spot prices,
/// without touching the catalog. `Ok(None)` when the item has no config.
pub async fn explain_item(
    spot: &dyn SpotPriceRepository,
    configs: &dyn VariantConfigStore,
    formulas: &dyn FormulaRegistry,
    item_id: &str,
) -> Result<Option<PriceTrace>, PipelineError> {
    let active = formulas
        .get_active()
        .await
        .map_err(PipelineError::unexpected("load active formula"))?
        .ok_or(PreconditionError::NoActiveFormula)?;
    let Some(config) = configs
        .get_by_item_id(item_id)
        .await
        .map_err(PipelineError::unexpected("load variant config"))?
    else {
        return Ok(None);
    };
    let snapshot = load_spot_snapshot(spot)
        .await
        .map_err(PipelineError::unexpected("load spot snapshot"))?;
    Ok(Some(calculate_with_trace(
        &active.formula_code(),
        &config.fields,
        &snapshot,
    )))
}
