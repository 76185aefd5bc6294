//! Storage and catalog boundaries used by the pipeline.
//!
//! All traits are object-safe and `Send + Sync` so callers can hold
//! `Arc<dyn ...>` across async tasks.

use mpr_schemas::{
    FormulaVariant, GoldPurity, Metal, MetalSpotPrice, NewSpotPrice, SpotQuote, VariantConfig,
    VariantConfigFields,
};
use rust_decimal::Decimal;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `set_active` was given an id with no matching formula variant.
    #[error("formula variant {0} not found")]
    FormulaNotFound(i64),
    #[error("spot price rejected: {0}")]
    InvalidSpotPrice(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Failures talking to the external catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Connection, timeout, or other network failure before a response.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("catalog http status {status}: {body}")]
    Http { status: u16, body: String },
    /// Top-level query errors returned in a successful response.
    #[error("catalog query error: {0}")]
    Query(String),
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl CatalogError {
    /// Whether a retry could plausibly succeed. Throttling and 5xx count.
    pub fn is_transport(&self) -> bool {
        match self {
            CatalogError::Transport(_) => true,
            CatalogError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Result of one price submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Item ids the catalog reports as updated.
    pub updated: Vec<String>,
    /// Inline validation messages, in catalog order.
    pub validation_errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait SpotPriceRepository: Send + Sync {
    /// Most recent price for the bucket, by capture time. `purity` is only
    /// meaningful for gold.
    async fn latest(
        &self,
        metal: Metal,
        purity: Option<GoldPurity>,
    ) -> Result<Option<SpotQuote>, StoreError>;

    /// Append one observation to the log.
    async fn record(&self, new: NewSpotPrice) -> Result<MetalSpotPrice, StoreError>;

    /// Append a batch atomically: every row is written or none is.
    async fn record_all(&self, rows: Vec<NewSpotPrice>) -> Result<Vec<MetalSpotPrice>, StoreError>;
}

#[async_trait::async_trait]
pub trait VariantConfigStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<VariantConfig>, StoreError>;

    async fn get_by_item_id(&self, item_id: &str) -> Result<Option<VariantConfig>, StoreError>;

    /// Create or replace the whole field set for `item_id`.
    async fn upsert(
        &self,
        item_id: &str,
        fields: VariantConfigFields,
    ) -> Result<VariantConfig, StoreError>;
}

#[async_trait::async_trait]
pub trait FormulaRegistry: Send + Sync {
    async fn list_all(&self) -> Result<Vec<FormulaVariant>, StoreError>;

    async fn get_active(&self) -> Result<Option<FormulaVariant>, StoreError>;

    /// Make `id` the only active variant. Unknown ids fail with
    /// [`StoreError::FormulaNotFound`] and leave the previous selection in place.
    async fn set_active(&self, id: i64) -> Result<FormulaVariant, StoreError>;
}

#[async_trait::async_trait]
pub trait CatalogSyncClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parent container (product) id of a catalog item (variant).
    async fn resolve_parent(&self, item_id: &str) -> Result<String, CatalogError>;

    /// Write `price` to exactly one item under `parent_id`.
    async fn submit_price(
        &self,
        parent_id: &str,
        item_id: &str,
        price: Decimal,
    ) -> Result<SubmitOutcome, CatalogError>;
}
