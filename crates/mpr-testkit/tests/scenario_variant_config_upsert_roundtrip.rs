use anyhow::Result;
use mpr_reconcile::VariantConfigStore;
use mpr_schemas::VariantConfigFields;
use mpr_testkit::InMemoryVariantConfigs;
use rust_decimal_macros::dec;

#[tokio::test]
async fn upsert_then_get_returns_same_fields() -> Result<()> {
    let store = InMemoryVariantConfigs::new();
    let fields = VariantConfigFields {
        metal_type: Some("Gold".to_string()),
        purity: Some("18K".to_string()),
        weight: Some(dec!(3.75)),
        making_charges: Some(dec!(12.5)),
        compare_at_margin_pct: Some(dec!(20)),
        remarks: Some("bridal".to_string()),
        ..Default::default()
    };

    let written = store.upsert("v-100", fields.clone()).await?;
    let read = store.get_by_item_id("v-100").await?.expect("config present");

    assert_eq!(read.fields, fields);
    assert_eq!(read, written);
    assert!(store.get_by_item_id("v-missing").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn second_upsert_updates_instead_of_duplicating() -> Result<()> {
    let store = InMemoryVariantConfigs::new();
    store
        .upsert(
            "v-7",
            VariantConfigFields {
                weight: Some(dec!(1)),
                tax_pct: Some(dec!(3)),
                ..Default::default()
            },
        )
        .await?;
    let updated = store
        .upsert(
            "v-7",
            VariantConfigFields {
                weight: Some(dec!(2)),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(store.len(), 1);
    assert_eq!(updated.fields.weight, Some(dec!(2)));
    // The write replaces the whole field set.
    assert_eq!(updated.fields.tax_pct, None);
    assert!(updated.updated_at >= updated.created_at);
    Ok(())
}
