use std::io::Read;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use mpr_schemas::{GoldPurity, Metal, MetalSpotPrice, NewSpotPrice, SpotBucket, SpotQuote};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

fn row_to_spot_price(row: &PgRow) -> Result<MetalSpotPrice> {
    let metal_s: String = row.try_get("metal")?;
    let purity_s: Option<String> = row.try_get("purity")?;
    let metal =
        Metal::parse(&metal_s).ok_or_else(|| anyhow!("unknown metal in spot_prices: {metal_s}"))?;
    let purity = match purity_s {
        Some(p) => Some(
            GoldPurity::parse(&p).ok_or_else(|| anyhow!("unknown purity in spot_prices: {p}"))?,
        ),
        None => None,
    };
    Ok(MetalSpotPrice {
        id: row.try_get("id")?,
        metal,
        purity,
        price: row.try_get("price")?,
        currency: row.try_get("currency")?,
        captured_at: row.try_get("captured_at")?,
    })
}

/// Most recent observation for one bucket. Ties on `captured_at` go to the
/// later insert.
pub async fn latest_spot_price(
    pool: &PgPool,
    metal: Metal,
    purity: Option<GoldPurity>,
) -> Result<Option<SpotQuote>> {
    let row = sqlx::query(
        r#"
        select id, metal, purity, price, currency, captured_at
        from spot_prices
        where metal = $1
          and purity is not distinct from $2
        order by captured_at desc, id desc
        limit 1
        "#,
    )
    .bind(metal.as_str())
    .bind(purity.map(|p| p.as_str()))
    .fetch_optional(pool)
    .await
    .context("latest_spot_price failed")?;

    row.map(|r| row_to_spot_price(&r).map(|p| p.quote()))
        .transpose()
}

/// Append observations in one transaction. `captured_at = None` uses the
/// database clock. Any failed insert rolls back the whole batch.
pub async fn insert_spot_prices(pool: &PgPool, rows: &[NewSpotPrice]) -> Result<Vec<MetalSpotPrice>> {
    let mut tx = pool.begin().await.context("insert_spot_prices begin failed")?;
    let mut saved = Vec::with_capacity(rows.len());

    for (idx, new) in rows.iter().enumerate() {
        let row = sqlx::query(
            r#"
            insert into spot_prices (metal, purity, price, currency, captured_at)
            values ($1, $2, $3, $4, coalesce($5, now()))
            returning id, metal, purity, price, currency, captured_at
            "#,
        )
        .bind(new.bucket.metal().as_str())
        .bind(new.bucket.purity().map(|p| p.as_str()))
        .bind(new.price)
        .bind(&new.currency)
        .bind(new.captured_at)
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("insert_spot_prices row {idx} failed for {}", new.bucket))?;
        saved.push(row_to_spot_price(&row)?);
    }

    tx.commit().await.context("insert_spot_prices commit failed")?;
    Ok(saved)
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotImportReport {
    pub rows_read: usize,
    pub rows_inserted: usize,
}

#[derive(Debug, Deserialize)]
struct SpotCsvRow {
    metal: String,
    #[serde(default)]
    purity: Option<String>,
    price: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    captured_at: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse spot prices from CSV with headers `metal,purity,price,currency,captured_at`.
///
/// `purity`, `currency` and `captured_at` may be blank; a blank currency
/// becomes `default_currency`. Any bad row fails the whole file and names
/// its line.
pub fn read_spot_prices_csv<R: Read>(reader: R, default_currency: &str) -> Result<Vec<NewSpotPrice>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut out = Vec::new();

    for (idx, rec) in rdr.deserialize::<SpotCsvRow>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = rec.with_context(|| format!("spot csv line {line}: malformed row"))?;

        let metal = Metal::parse(&row.metal)
            .ok_or_else(|| anyhow!("spot csv line {line}: unknown metal '{}'", row.metal))?;
        let purity = match non_blank(row.purity) {
            Some(p) => Some(
                GoldPurity::parse(&p)
                    .ok_or_else(|| anyhow!("spot csv line {line}: unknown purity '{p}'"))?,
            ),
            None => None,
        };
        let bucket = SpotBucket::from_parts(metal, purity).ok_or_else(|| {
            anyhow!("spot csv line {line}: purity is required for gold and not allowed otherwise")
        })?;

        let price = Decimal::from_str(row.price.trim())
            .with_context(|| format!("spot csv line {line}: invalid price '{}'", row.price))?;
        if price < Decimal::ZERO {
            bail!("spot csv line {line}: negative price {price}");
        }

        let captured_at = match non_blank(row.captured_at) {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(&ts)
                    .with_context(|| format!("spot csv line {line}: invalid captured_at '{ts}'"))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        out.push(NewSpotPrice {
            bucket,
            price,
            currency: non_blank(row.currency).unwrap_or_else(|| default_currency.to_string()),
            captured_at,
        });
    }

    Ok(out)
}

/// Insert all rows in one transaction.
pub async fn import_spot_prices(pool: &PgPool, rows: &[NewSpotPrice]) -> Result<SpotImportReport> {
    let mut tx = pool.begin().await.context("import_spot_prices begin failed")?;
    let mut inserted = 0usize;

    for new in rows {
        sqlx::query(
            r#"
            insert into spot_prices (metal, purity, price, currency, captured_at)
            values ($1, $2, $3, $4, coalesce($5, now()))
            "#,
        )
        .bind(new.bucket.metal().as_str())
        .bind(new.bucket.purity().map(|p| p.as_str()))
        .bind(new.price)
        .bind(&new.currency)
        .bind(new.captured_at)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("import_spot_prices insert failed for {}", new.bucket))?;
        inserted += 1;
    }

    tx.commit().await.context("import_spot_prices commit failed")?;
    Ok(SpotImportReport {
        rows_read: rows.len(),
        rows_inserted: inserted,
    })
}
