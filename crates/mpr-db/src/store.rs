use mpr_reconcile::{FormulaRegistry, SpotPriceRepository, StoreError, VariantConfigStore};
use mpr_schemas::{
    FormulaVariant, GoldPurity, Metal, MetalSpotPrice, NewSpotPrice, SpotQuote, VariantConfig,
    VariantConfigFields,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{formulas, spot, sqlstate, variants};

/// Postgres-backed implementation of the three store ports.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl SpotPriceRepository for PgStore {
    async fn latest(
        &self,
        metal: Metal,
        purity: Option<GoldPurity>,
    ) -> Result<Option<SpotQuote>, StoreError> {
        Ok(spot::latest_spot_price(&self.pool, metal, purity).await?)
    }

    async fn record(&self, new: NewSpotPrice) -> Result<MetalSpotPrice, StoreError> {
        let mut saved = self.record_all(vec![new]).await?;
        saved
            .pop()
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("insert returned no row")))
    }

    async fn record_all(&self, rows: Vec<NewSpotPrice>) -> Result<Vec<MetalSpotPrice>, StoreError> {
        if let Some(bad) = rows.iter().find(|r| r.price < Decimal::ZERO) {
            return Err(StoreError::InvalidSpotPrice(format!(
                "negative price {} for {}",
                bad.price, bad.bucket
            )));
        }
        spot::insert_spot_prices(&self.pool, &rows)
            .await
            .map_err(spot_write_error)
    }
}

/// Rows the database refuses become `InvalidSpotPrice`; anything else stays a
/// backend failure.
fn spot_write_error(e: anyhow::Error) -> StoreError {
    let code = e.downcast_ref::<sqlx::Error>().and_then(sqlstate);
    match code.as_deref() {
        // 23514: check_violation, 22003: numeric_value_out_of_range
        Some("23514") | Some("22003") => StoreError::InvalidSpotPrice(format!("{e:#}")),
        _ => e.into(),
    }
}

#[async_trait::async_trait]
impl VariantConfigStore for PgStore {
    async fn list_all(&self) -> Result<Vec<VariantConfig>, StoreError> {
        Ok(variants::list_variant_configs(&self.pool).await?)
    }

    async fn get_by_item_id(&self, item_id: &str) -> Result<Option<VariantConfig>, StoreError> {
        Ok(variants::get_variant_config(&self.pool, item_id).await?)
    }

    async fn upsert(
        &self,
        item_id: &str,
        fields: VariantConfigFields,
    ) -> Result<VariantConfig, StoreError> {
        Ok(variants::upsert_variant_config(&self.pool, item_id, &fields).await?)
    }
}

#[async_trait::async_trait]
impl FormulaRegistry for PgStore {
    async fn list_all(&self) -> Result<Vec<FormulaVariant>, StoreError> {
        Ok(formulas::list_formulas(&self.pool).await?)
    }

    async fn get_active(&self) -> Result<Option<FormulaVariant>, StoreError> {
        Ok(formulas::get_active_formula(&self.pool).await?)
    }

    async fn set_active(&self, id: i64) -> Result<FormulaVariant, StoreError> {
        formulas::set_active_formula(&self.pool, id).await
    }
}
