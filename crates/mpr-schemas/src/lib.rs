//! mpr-schemas
//!
//! Shared domain types for the metal price reconciler. Types only: no IO,
//! no pricing logic. Every HTTP-facing struct serializes as camelCase.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Metals and spot-price buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
    Platinum,
    Palladium,
}

impl Metal {
    pub const ALL: [Metal; 4] = [Metal::Gold, Metal::Silver, Metal::Platinum, Metal::Palladium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
            Metal::Platinum => "platinum",
            Metal::Palladium => "palladium",
        }
    }

    /// Case-insensitive parse. Unknown metals return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Some(Metal::Gold),
            "silver" => Some(Metal::Silver),
            "platinum" => Some(Metal::Platinum),
            "palladium" => Some(Metal::Palladium),
            _ => None,
        }
    }
}

/// Gold purity grade. Only gold carries a purity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GoldPurity {
    #[serde(rename = "24K")]
    K24,
    #[serde(rename = "22K")]
    K22,
    #[serde(rename = "18K")]
    K18,
    #[serde(rename = "14K")]
    K14,
}

impl GoldPurity {
    pub const ALL: [GoldPurity; 4] = [
        GoldPurity::K24,
        GoldPurity::K22,
        GoldPurity::K18,
        GoldPurity::K14,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoldPurity::K24 => "24K",
            GoldPurity::K22 => "22K",
            GoldPurity::K18 => "18K",
            GoldPurity::K14 => "14K",
        }
    }

    /// Accepts `"24K"`, `"24k"`, `" 22K "`. Anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "24K" => Some(GoldPurity::K24),
            "22K" => Some(GoldPurity::K22),
            "18K" => Some(GoldPurity::K18),
            "14K" => Some(GoldPurity::K14),
            _ => None,
        }
    }
}

/// One of the seven keys the spot-price log is bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SpotBucket {
    Gold(GoldPurity),
    Silver,
    Platinum,
    Palladium,
}

impl SpotBucket {
    /// Fixed snapshot order: gold 24K/22K/18K/14K, silver, platinum, palladium.
    pub const ALL: [SpotBucket; 7] = [
        SpotBucket::Gold(GoldPurity::K24),
        SpotBucket::Gold(GoldPurity::K22),
        SpotBucket::Gold(GoldPurity::K18),
        SpotBucket::Gold(GoldPurity::K14),
        SpotBucket::Silver,
        SpotBucket::Platinum,
        SpotBucket::Palladium,
    ];

    /// Build a bucket from its parts.
    ///
    /// Gold requires a purity; every other metal must not carry one.
    pub fn from_parts(metal: Metal, purity: Option<GoldPurity>) -> Option<Self> {
        match (metal, purity) {
            (Metal::Gold, Some(p)) => Some(SpotBucket::Gold(p)),
            (Metal::Silver, None) => Some(SpotBucket::Silver),
            (Metal::Platinum, None) => Some(SpotBucket::Platinum),
            (Metal::Palladium, None) => Some(SpotBucket::Palladium),
            _ => None,
        }
    }

    pub fn metal(&self) -> Metal {
        match self {
            SpotBucket::Gold(_) => Metal::Gold,
            SpotBucket::Silver => Metal::Silver,
            SpotBucket::Platinum => Metal::Platinum,
            SpotBucket::Palladium => Metal::Palladium,
        }
    }

    pub fn purity(&self) -> Option<GoldPurity> {
        match self {
            SpotBucket::Gold(p) => Some(*p),
            _ => None,
        }
    }

    /// Stable short key, e.g. `"gold24k"`, `"silver"`.
    pub fn key(&self) -> &'static str {
        match self {
            SpotBucket::Gold(GoldPurity::K24) => "gold24k",
            SpotBucket::Gold(GoldPurity::K22) => "gold22k",
            SpotBucket::Gold(GoldPurity::K18) => "gold18k",
            SpotBucket::Gold(GoldPurity::K14) => "gold14k",
            SpotBucket::Silver => "silver",
            SpotBucket::Platinum => "platinum",
            SpotBucket::Palladium => "palladium",
        }
    }
}

impl std::fmt::Display for SpotBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.purity() {
            Some(p) => write!(f, "{} {}", self.metal().as_str(), p.as_str()),
            None => write!(f, "{}", self.metal().as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Spot prices
// ---------------------------------------------------------------------------

/// One row of the append-only spot-price log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalSpotPrice {
    pub id: i64,
    pub metal: Metal,
    /// Present only for gold.
    pub purity: Option<GoldPurity>,
    /// Price per unit weight.
    pub price: Decimal,
    pub currency: String,
    pub captured_at: DateTime<Utc>,
}

impl MetalSpotPrice {
    pub fn bucket(&self) -> Option<SpotBucket> {
        SpotBucket::from_parts(self.metal, self.purity)
    }

    pub fn quote(&self) -> SpotQuote {
        SpotQuote {
            price: self.price,
            currency: self.currency.clone(),
            captured_at: self.captured_at,
        }
    }
}

/// Latest price for a bucket, as returned by the spot-price repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotQuote {
    pub price: Decimal,
    pub currency: String,
    pub captured_at: DateTime<Utc>,
}

/// Insert payload for the spot-price log. `captured_at = None` means "now".
#[derive(Debug, Clone, PartialEq)]
pub struct NewSpotPrice {
    pub bucket: SpotBucket,
    pub price: Decimal,
    pub currency: String,
    pub captured_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Formula variants
// ---------------------------------------------------------------------------

/// Calculation order selector. Codes outside `"1"`..`"4"` are kept verbatim
/// and evaluate with the default (no-charges) order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormulaCode {
    One,
    Two,
    Three,
    Four,
    Unrecognized(String),
}

impl FormulaCode {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "1" => FormulaCode::One,
            "2" => FormulaCode::Two,
            "3" => FormulaCode::Three,
            "4" => FormulaCode::Four,
            other => FormulaCode::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FormulaCode::One => "1",
            FormulaCode::Two => "2",
            FormulaCode::Three => "3",
            FormulaCode::Four => "4",
            FormulaCode::Unrecognized(s) => s.as_str(),
        }
    }
}

impl std::fmt::Display for FormulaCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaVariant {
    pub id: i64,
    pub code: String,
    pub is_active: bool,
}

impl FormulaVariant {
    pub fn formula_code(&self) -> FormulaCode {
        FormulaCode::parse(&self.code)
    }
}

// ---------------------------------------------------------------------------
// Variant configuration
// ---------------------------------------------------------------------------

/// Per-item pricing inputs. Every field is optional and stored as given;
/// numeric defaults are applied by the pricing engine, never here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantConfigFields {
    /// Free text so unknown metals survive storage (they price at 0).
    #[serde(default)]
    pub metal_type: Option<String>,
    /// Gold purity grade, e.g. `"22K"`. Ignored for other metals.
    #[serde(default)]
    pub purity: Option<String>,
    #[serde(default)]
    pub weight: Option<Decimal>,
    #[serde(default)]
    pub diamond_price: Option<Decimal>,
    #[serde(default)]
    pub moissanite_price: Option<Decimal>,
    #[serde(default)]
    pub gemstone_price: Option<Decimal>,
    /// Percent in formulas 1 and 2, flat in 3, per unit weight in 4.
    #[serde(default)]
    pub making_charges: Option<Decimal>,
    #[serde(default)]
    pub wastage_pct: Option<Decimal>,
    /// Flat amount.
    #[serde(default)]
    pub misc_charges: Option<Decimal>,
    #[serde(default)]
    pub shipping_pct: Option<Decimal>,
    #[serde(default)]
    pub markup_pct: Option<Decimal>,
    #[serde(default)]
    pub tax_pct: Option<Decimal>,
    /// Stored for the catalog's compare-at price; not used by any formula.
    #[serde(default)]
    pub compare_at_margin_pct: Option<Decimal>,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantConfig {
    /// External catalog reference of the item (unique).
    pub item_id: String,
    #[serde(flatten)]
    pub fields: VariantConfigFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Run results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemOutcome {
    Success,
    Invalid,
    ResolutionFailed,
    SubmissionFailed,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResult {
    pub item_id: String,
    pub computed_price: Decimal,
    pub outcome: ItemOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRunSummary {
    pub run_id: Uuid,
    pub success_count: usize,
    pub failed_count: usize,
    /// One message per failed item, in processing order.
    pub errors: Vec<String>,
    pub formula_used: String,
    pub total_processed: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bucket_from_parts_enforces_purity_only_for_gold() {
        assert_eq!(
            SpotBucket::from_parts(Metal::Gold, Some(GoldPurity::K18)),
            Some(SpotBucket::Gold(GoldPurity::K18))
        );
        assert_eq!(SpotBucket::from_parts(Metal::Gold, None), None);
        assert_eq!(
            SpotBucket::from_parts(Metal::Silver, Some(GoldPurity::K24)),
            None
        );
        assert_eq!(
            SpotBucket::from_parts(Metal::Palladium, None),
            Some(SpotBucket::Palladium)
        );
    }

    #[test]
    fn all_buckets_have_distinct_keys() {
        let mut keys: Vec<&str> = SpotBucket::ALL.iter().map(|b| b.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn purity_parse_is_case_insensitive() {
        assert_eq!(GoldPurity::parse("22k"), Some(GoldPurity::K22));
        assert_eq!(GoldPurity::parse(" 14K "), Some(GoldPurity::K14));
        assert_eq!(GoldPurity::parse("9K"), None);
    }

    #[test]
    fn formula_code_keeps_unrecognized_text() {
        assert_eq!(FormulaCode::parse("3"), FormulaCode::Three);
        let other = FormulaCode::parse("legacy");
        assert_eq!(other, FormulaCode::Unrecognized("legacy".to_string()));
        assert_eq!(other.as_str(), "legacy");
    }

    #[test]
    fn variant_config_serializes_flat_camel_case() {
        let cfg = VariantConfig {
            item_id: "gid://shop/ProductVariant/1".to_string(),
            fields: VariantConfigFields {
                metal_type: Some("Gold".to_string()),
                purity: Some("22K".to_string()),
                weight: Some(dec!(4.5)),
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["itemId"], "gid://shop/ProductVariant/1");
        assert_eq!(v["metalType"], "Gold");
        assert_eq!(v["weight"], "4.5");
        assert!(v["markupPct"].is_null());
    }

    #[test]
    fn config_fields_accept_numbers_and_missing_keys() {
        let fields: VariantConfigFields =
            serde_json::from_str(r#"{"metalType":"silver","weight":12,"taxPct":"3"}"#).unwrap();
        assert_eq!(fields.weight, Some(dec!(12)));
        assert_eq!(fields.tax_pct, Some(dec!(3)));
        assert_eq!(fields.markup_pct, None);
    }
}
