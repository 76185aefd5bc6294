//! `mpr spot` handlers: record, import, latest.

use std::fs::File;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use mpr_db::PgStore;
use mpr_reconcile::SpotPriceRepository;
use mpr_schemas::{GoldPurity, Metal, NewSpotPrice, SpotBucket};
use rust_decimal::Decimal;

use super::{load_app_config, print_json};

fn bucket_from_args(metal: &str, purity: Option<&str>) -> Result<SpotBucket> {
    let m = Metal::parse(metal).ok_or_else(|| anyhow!("unknown metal '{metal}'"))?;
    let p = match purity.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => Some(GoldPurity::parse(p).ok_or_else(|| anyhow!("unknown purity '{p}'"))?),
        None => None,
    };
    SpotBucket::from_parts(m, p)
        .ok_or_else(|| anyhow!("--purity is required for gold and not allowed for {metal}"))
}

pub async fn spot_record(
    config_paths: &[String],
    metal: &str,
    purity: Option<&str>,
    price: Decimal,
    currency: Option<String>,
    captured_at: Option<DateTime<Utc>>,
) -> Result<()> {
    let cfg = load_app_config(config_paths)?;
    let bucket = bucket_from_args(metal, purity)?;
    if price < Decimal::ZERO {
        bail!("negative price {price}");
    }

    let pool = mpr_db::connect_from_env().await?;
    let store = PgStore::new(pool);
    let row = store
        .record(NewSpotPrice {
            bucket,
            price,
            currency: currency.unwrap_or(cfg.pricing.currency),
            captured_at,
        })
        .await?;
    print_json(&row)
}

pub async fn spot_import(config_paths: &[String], file: &str) -> Result<()> {
    let cfg = load_app_config(config_paths)?;
    let f = File::open(file).with_context(|| format!("open spot csv failed: {file}"))?;
    let rows = mpr_db::read_spot_prices_csv(f, &cfg.pricing.currency)?;

    let pool = mpr_db::connect_from_env().await?;
    let report = mpr_db::import_spot_prices(&pool, &rows).await?;
    println!(
        "rows_read={} rows_inserted={}",
        report.rows_read, report.rows_inserted
    );
    Ok(())
}

pub async fn spot_latest() -> Result<()> {
    let pool = mpr_db::connect_from_env().await?;
    for bucket in SpotBucket::ALL {
        match mpr_db::latest_spot_price(&pool, bucket.metal(), bucket.purity()).await? {
            Some(q) => println!(
                "bucket={} price={} currency={} captured_at={}",
                bucket.key(),
                q.price,
                q.currency,
                q.captured_at.to_rfc3339()
            ),
            None => println!("bucket={} price=0 currency= captured_at=", bucket.key()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_args_follow_purity_rules() {
        assert_eq!(
            bucket_from_args("GOLD", Some("14k")).unwrap(),
            SpotBucket::Gold(GoldPurity::K14)
        );
        assert_eq!(
            bucket_from_args("palladium", Some(" ")).unwrap(),
            SpotBucket::Palladium
        );
        assert!(bucket_from_args("gold", None).is_err());
        assert!(bucket_from_args("silver", Some("22K")).is_err());
        assert!(bucket_from_args("tin", None).is_err());
    }
}
