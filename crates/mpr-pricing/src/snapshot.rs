use std::collections::BTreeMap;

use mpr_schemas::{GoldPurity, Metal, SpotBucket};
use rust_decimal::Decimal;

/// Per-unit spot prices for the seven buckets, frozen for one run.
///
/// Missing buckets read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotSnapshot {
    prices: BTreeMap<SpotBucket, Decimal>,
}

impl SpotSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, bucket: SpotBucket, price: Decimal) {
        self.prices.insert(bucket, price);
    }

    pub fn with(mut self, bucket: SpotBucket, price: Decimal) -> Self {
        self.set(bucket, price);
        self
    }

    pub fn price(&self, bucket: SpotBucket) -> Decimal {
        self.prices.get(&bucket).copied().unwrap_or(Decimal::ZERO)
    }

    /// All seven buckets in [`SpotBucket::ALL`] order, zero-filled.
    pub fn entries(&self) -> impl Iterator<Item = (SpotBucket, Decimal)> + '_ {
        SpotBucket::ALL.iter().map(move |b| (*b, self.price(*b)))
    }

    /// Resolve the per-unit metal price for an item's raw `metal_type` and
    /// `purity` text.
    ///
    /// - gold: one of the four purity grades; unknown or missing purity is 0
    /// - silver / platinum / palladium: direct lookup, purity ignored
    /// - anything else (including missing): 0
    pub fn per_unit_price(&self, metal_type: Option<&str>, purity: Option<&str>) -> Decimal {
        let Some(metal) = metal_type.and_then(Metal::parse) else {
            return Decimal::ZERO;
        };
        let bucket = match metal {
            Metal::Gold => match purity.and_then(GoldPurity::parse) {
                Some(p) => SpotBucket::Gold(p),
                None => return Decimal::ZERO,
            },
            Metal::Silver => SpotBucket::Silver,
            Metal::Platinum => SpotBucket::Platinum,
            Metal::Palladium => SpotBucket::Palladium,
        };
        self.price(bucket)
    }
}
