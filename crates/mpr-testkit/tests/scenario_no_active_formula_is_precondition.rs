use mpr_reconcile::{run_reconciliation, PipelineError, PreconditionError, ReconcileOptions};
use mpr_schemas::VariantConfigFields;
use mpr_testkit::{config, Harness, InMemoryVariantConfigs};
use rust_decimal_macros::dec;

#[tokio::test]
async fn no_active_formula_aborts_before_any_item() {
    let mut h = Harness::new();
    h.formulas.clear_active();
    h.configs = InMemoryVariantConfigs::with_configs(vec![config(
        "v1",
        VariantConfigFields {
            diamond_price: Some(dec!(100)),
            ..Default::default()
        },
    )]);

    let err = run_reconciliation(h.ports(), &ReconcileOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Precondition(PreconditionError::NoActiveFormula)
    ));
    assert_eq!(
        err.to_string(),
        "No active formula found. Please set a formula in settings."
    );
    assert_eq!(h.catalog.total_calls(), 0);
}
