//! mpr-reconcile
//!
//! Batch reconciliation: price every configured item with the active formula
//! against one spot-price snapshot and push each price to the catalog.
//!
//! The pipeline talks to storage and the catalog only through the traits in
//! [`ports`]; `mpr-db`, `mpr-catalog` and `mpr-testkit` supply implementations.

pub mod ports;
mod pipeline;

pub use pipeline::{
    explain_item, load_spot_snapshot, run_reconciliation, run_reconciliation_with_id,
    PipelineError, PreconditionError, ReconcileOptions, ReconcilePorts, ReconcileRun, RunTally,
};
pub use ports::{
    CatalogError, CatalogSyncClient, FormulaRegistry, SpotPriceRepository, StoreError,
    SubmitOutcome, VariantConfigStore,
};
