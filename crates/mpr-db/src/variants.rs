use anyhow::{Context, Result};
use mpr_schemas::{VariantConfig, VariantConfigFields};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const COLUMNS: &str = "item_id, metal_type, purity, weight, diamond_price, moissanite_price, \
     gemstone_price, making_charges, wastage_pct, misc_charges, shipping_pct, markup_pct, \
     tax_pct, compare_at_margin_pct, remarks, created_at, updated_at";

fn row_to_config(row: &PgRow) -> Result<VariantConfig> {
    Ok(VariantConfig {
        item_id: row.try_get("item_id")?,
        fields: VariantConfigFields {
            metal_type: row.try_get("metal_type")?,
            purity: row.try_get("purity")?,
            weight: row.try_get("weight")?,
            diamond_price: row.try_get("diamond_price")?,
            moissanite_price: row.try_get("moissanite_price")?,
            gemstone_price: row.try_get("gemstone_price")?,
            making_charges: row.try_get("making_charges")?,
            wastage_pct: row.try_get("wastage_pct")?,
            misc_charges: row.try_get("misc_charges")?,
            shipping_pct: row.try_get("shipping_pct")?,
            markup_pct: row.try_get("markup_pct")?,
            tax_pct: row.try_get("tax_pct")?,
            compare_at_margin_pct: row.try_get("compare_at_margin_pct")?,
            remarks: row.try_get("remarks")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// All configs in creation order.
pub async fn list_variant_configs(pool: &PgPool) -> Result<Vec<VariantConfig>> {
    let rows = sqlx::query(&format!("select {COLUMNS} from variant_configs order by id"))
        .fetch_all(pool)
        .await
        .context("list_variant_configs failed")?;
    rows.iter().map(row_to_config).collect()
}

pub async fn get_variant_config(pool: &PgPool, item_id: &str) -> Result<Option<VariantConfig>> {
    let row = sqlx::query(&format!(
        "select {COLUMNS} from variant_configs where item_id = $1"
    ))
    .bind(item_id)
    .fetch_optional(pool)
    .await
    .context("get_variant_config failed")?;
    row.as_ref().map(row_to_config).transpose()
}

/// Insert or replace every field for `item_id`. A `None` field is stored as
/// NULL even when the row previously had a value.
pub async fn upsert_variant_config(
    pool: &PgPool,
    item_id: &str,
    f: &VariantConfigFields,
) -> Result<VariantConfig> {
    let sql = format!(
        r#"
        insert into variant_configs (
          item_id, metal_type, purity, weight, diamond_price, moissanite_price,
          gemstone_price, making_charges, wastage_pct, misc_charges, shipping_pct,
          markup_pct, tax_pct, compare_at_margin_pct, remarks
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15
        )
        on conflict (item_id) do update set
          metal_type = excluded.metal_type,
          purity = excluded.purity,
          weight = excluded.weight,
          diamond_price = excluded.diamond_price,
          moissanite_price = excluded.moissanite_price,
          gemstone_price = excluded.gemstone_price,
          making_charges = excluded.making_charges,
          wastage_pct = excluded.wastage_pct,
          misc_charges = excluded.misc_charges,
          shipping_pct = excluded.shipping_pct,
          markup_pct = excluded.markup_pct,
          tax_pct = excluded.tax_pct,
          compare_at_margin_pct = excluded.compare_at_margin_pct,
          remarks = excluded.remarks,
          updated_at = now()
        returning {COLUMNS}
        "#
    );

    let row = sqlx::query(&sql)
        .bind(item_id)
        .bind(&f.metal_type)
        .bind(&f.purity)
        .bind(f.weight)
        .bind(f.diamond_price)
        .bind(f.moissanite_price)
        .bind(f.gemstone_price)
        .bind(f.making_charges)
        .bind(f.wastage_pct)
        .bind(f.misc_charges)
        .bind(f.shipping_pct)
        .bind(f.markup_pct)
        .bind(f.tax_pct)
        .bind(f.compare_at_margin_pct)
        .bind(&f.remarks)
        .fetch_one(pool)
        .await
        .with_context(|| format!("upsert_variant_config failed for {item_id}"))?;

    row_to_config(&row)
}
