//! A run with no configured items aborts before touching the catalog.

use mpr_reconcile::{run_reconciliation, PipelineError, PreconditionError, ReconcileOptions};
use mpr_testkit::Harness;

#[tokio::test]
async fn zero_configs_is_a_precondition_failure_with_no_catalog_traffic() {
    let h = Harness::new();

    let err = run_reconciliation(h.ports(), &ReconcileOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Precondition(PreconditionError::NoConfiguredItems)
    ));
    assert_eq!(h.catalog.total_calls(), 0);
}
