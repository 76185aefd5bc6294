//! mpr-testkit
//!
//! Deterministic in-memory implementations of every reconciliation port,
//! plus a scripted catalog that records each call. No network, no database.

mod catalog;
mod stores;

pub use catalog::{CatalogScript, ScriptedCatalog, Submission};
pub use stores::{InMemoryFormulas, InMemorySpotPrices, InMemoryVariantConfigs};

use chrono::{DateTime, TimeZone, Utc};
use mpr_reconcile::ReconcilePorts;
use mpr_schemas::{VariantConfig, VariantConfigFields};

/// Fixed timestamp for fixtures that need one.
pub fn fixed_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 2, 15, 30, 0)
        .single()
        .unwrap_or_default()
}

/// A config row as it would come back from a store.
pub fn config(item_id: &str, fields: VariantConfigFields) -> VariantConfig {
    VariantConfig {
        item_id: item_id.to_string(),
        fields,
        created_at: fixed_ts(),
        updated_at: fixed_ts(),
    }
}

/// All four in-memory ports bundled for one test.
pub struct Harness {
    pub spot: InMemorySpotPrices,
    pub configs: InMemoryVariantConfigs,
    pub formulas: InMemoryFormulas,
    pub catalog: ScriptedCatalog,
}

impl Harness {
    /// Seeded formulas (code 1 active), no prices, no configs, a catalog that
    /// accepts everything.
    pub fn new() -> Self {
        Self {
            spot: InMemorySpotPrices::new(),
            configs: InMemoryVariantConfigs::new(),
            formulas: InMemoryFormulas::seeded(),
            catalog: ScriptedCatalog::new(),
        }
    }

    pub fn ports(&self) -> ReconcilePorts<'_> {
        ReconcilePorts {
            spot: &self.spot,
            configs: &self.configs,
            formulas: &self.formulas,
            catalog: &self.catalog,
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
