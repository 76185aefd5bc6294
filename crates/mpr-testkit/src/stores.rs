use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use mpr_reconcile::{FormulaRegistry, SpotPriceRepository, StoreError, VariantConfigStore};
use mpr_schemas::{
    FormulaVariant, GoldPurity, Metal, MetalSpotPrice, NewSpotPrice, SpotQuote, VariantConfig,
    VariantConfigFields,
};
use rust_decimal::Decimal;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Spot prices
// ---------------------------------------------------------------------------

/// Append-only spot-price log. Rejects negative prices like the Postgres
/// check constraint does.
#[derive(Debug, Default)]
pub struct InMemorySpotPrices {
    rows: Mutex<Vec<MetalSpotPrice>>,
    fail_batch_row: Mutex<Option<usize>>,
}

impl InMemorySpotPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<MetalSpotPrice> {
        lock(&self.rows).clone()
    }

    /// Make the next write fail with a backend error on batch row `idx`, as a
    /// dropped connection would.
    pub fn fail_next_write_at(&self, idx: usize) {
        *lock(&self.fail_batch_row) = Some(idx);
    }
}

#[async_trait::async_trait]
impl SpotPriceRepository for InMemorySpotPrices {
    async fn latest(
        &self,
        metal: Metal,
        purity: Option<GoldPurity>,
    ) -> Result<Option<SpotQuote>, StoreError> {
        let rows = lock(&self.rows);
        Ok(rows
            .iter()
            .filter(|r| r.metal == metal && r.purity == purity)
            .max_by_key(|r| (r.captured_at, r.id))
            .map(MetalSpotPrice::quote))
    }

    async fn record(&self, new: NewSpotPrice) -> Result<MetalSpotPrice, StoreError> {
        let mut saved = self.record_all(vec![new]).await?;
        saved
            .pop()
            .ok_or_else(|| StoreError::InvalidSpotPrice("empty batch".to_string()))
    }

    async fn record_all(&self, batch: Vec<NewSpotPrice>) -> Result<Vec<MetalSpotPrice>, StoreError> {
        if let Some(bad) = batch.iter().find(|r| r.price < Decimal::ZERO) {
            return Err(StoreError::InvalidSpotPrice(format!(
                "negative price {} for {}",
                bad.price, bad.bucket
            )));
        }
        if let Some(idx) = lock(&self.fail_batch_row).take() {
            if idx < batch.len() {
                return Err(StoreError::Backend(anyhow::anyhow!(
                    "connection reset while writing row {idx}"
                )));
            }
        }

        let mut rows = lock(&self.rows);
        let first_id = rows.len() as i64 + 1;
        let saved: Vec<MetalSpotPrice> = batch
            .into_iter()
            .enumerate()
            .map(|(i, new)| MetalSpotPrice {
                id: first_id + i as i64,
                metal: new.bucket.metal(),
                purity: new.bucket.purity(),
                price: new.price,
                currency: new.currency,
                captured_at: new.captured_at.unwrap_or_else(Utc::now),
            })
            .collect();
        rows.extend(saved.iter().cloned());
        Ok(saved)
    }
}

// ---------------------------------------------------------------------------
// Variant configs
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryVariantConfigs {
    // Insertion order is the listing order.
    rows: Mutex<Vec<VariantConfig>>,
}

impl InMemoryVariantConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configs(configs: Vec<VariantConfig>) -> Self {
        Self {
            rows: Mutex::new(configs),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.rows).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl VariantConfigStore for InMemoryVariantConfigs {
    async fn list_all(&self) -> Result<Vec<VariantConfig>, StoreError> {
        Ok(lock(&self.rows).clone())
    }

    async fn get_by_item_id(&self, item_id: &str) -> Result<Option<VariantConfig>, StoreError> {
        Ok(lock(&self.rows)
            .iter()
            .find(|c| c.item_id == item_id)
            .cloned())
    }

    async fn upsert(
        &self,
        item_id: &str,
        fields: VariantConfigFields,
    ) -> Result<VariantConfig, StoreError> {
        let now = Utc::now();
        let mut rows = lock(&self.rows);
        if let Some(existing) = rows.iter_mut().find(|c| c.item_id == item_id) {
            existing.fields = fields;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let row = VariantConfig {
            item_id: item_id.to_string(),
            fields,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryFormulas {
    rows: Mutex<Vec<FormulaVariant>>,
}

impl InMemoryFormulas {
    /// Codes "1".."4" with ids 1..4; code "1" active. Mirrors the seed migration.
    pub fn seeded() -> Self {
        let rows = (1..=4)
            .map(|i| FormulaVariant {
                id: i,
                code: i.to_string(),
                is_active: i == 1,
            })
            .collect();
        Self::with_variants(rows)
    }

    pub fn with_variants(rows: Vec<FormulaVariant>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Deactivate everything. Only reachable in tests; the registry API has
    /// no way to end up with zero active variants.
    pub fn clear_active(&self) {
        for r in lock(&self.rows).iter_mut() {
            r.is_active = false;
        }
    }

    pub fn active_count(&self) -> usize {
        lock(&self.rows).iter().filter(|r| r.is_active).count()
    }
}

#[async_trait::async_trait]
impl FormulaRegistry for InMemoryFormulas {
    async fn list_all(&self) -> Result<Vec<FormulaVariant>, StoreError> {
        let mut rows = lock(&self.rows).clone();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn get_active(&self) -> Result<Option<FormulaVariant>, StoreError> {
        Ok(lock(&self.rows).iter().find(|r| r.is_active).cloned())
    }

    async fn set_active(&self, id: i64) -> Result<FormulaVariant, StoreError> {
        let mut rows = lock(&self.rows);
        if !rows.iter().any(|r| r.id == id) {
            return Err(StoreError::FormulaNotFound(id));
        }
        let mut active = None;
        for r in rows.iter_mut() {
            r.is_active = r.id == id;
            if r.is_active {
                active = Some(r.clone());
            }
        }
        active.ok_or(StoreError::FormulaNotFound(id))
    }
}
