//! `mpr variant` handlers.

use anyhow::{bail, Result};
use mpr_schemas::VariantConfigFields;

use super::print_json;
use crate::VariantSetArgs;

pub async fn variant_get(item_id: &str) -> Result<()> {
    let pool = mpr_db::connect_from_env().await?;
    let config = mpr_db::get_variant_config(&pool, item_id.trim()).await?;
    print_json(&config)
}

pub async fn variant_set(args: VariantSetArgs) -> Result<()> {
    let item_id = args.item_id.trim().to_string();
    if item_id.is_empty() {
        bail!("--item-id must not be blank");
    }
    let fields = VariantConfigFields {
        metal_type: args.metal_type,
        purity: args.purity,
        weight: args.weight,
        diamond_price: args.diamond_price,
        moissanite_price: args.moissanite_price,
        gemstone_price: args.gemstone_price,
        making_charges: args.making_charges,
        wastage_pct: args.wastage_pct,
        misc_charges: args.misc_charges,
        shipping_pct: args.shipping_pct,
        markup_pct: args.markup_pct,
        tax_pct: args.tax_pct,
        compare_at_margin_pct: args.compare_at_margin_pct,
        remarks: args.remarks,
    };

    let pool = mpr_db::connect_from_env().await?;
    let saved = mpr_db::upsert_variant_config(&pool, &item_id, &fields).await?;
    print_json(&saved)
}
