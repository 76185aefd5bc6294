//! Formula evaluation.
//!
//! # Calculation orders
//!
//! | Code    | Order                                                                              |
//! |---------|------------------------------------------------------------------------------------|
//! | 1       | metal + stones, +making%, +wastage%, +shipping%, +misc, +markup%, +tax%            |
//! | 2       | metal, +making%, +wastage%, +stones, +shipping%, +misc, +markup%, +tax%            |
//! | 3       | metal, +wastage%, +making, +stones, +shipping%, +misc, +markup%, +tax%             |
//! | 4       | metal, +wastage%, +making x weight, +stones, +shipping%, +misc, +markup%, +tax%    |
//! | other   | metal + stones                                                                     |
//!
//! `metal = per-unit spot price x weight`, `stones = diamond + moissanite + gemstone`.
//! A percentage step adds `running_total x pct / 100` to the running total.
//! All arithmetic is `Decimal` with no intermediate rounding; the result is
//! rounded once, to an integer, midpoint away from zero.

use mpr_schemas::{FormulaCode, VariantConfigFields};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::SpotSnapshot;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Configuration numbers with every absent field resolved to zero.
///
/// This is the only place optional configuration values are defaulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PricingInputs {
    pub weight: Decimal,
    pub diamond_price: Decimal,
    pub moissanite_price: Decimal,
    pub gemstone_price: Decimal,
    pub making_charges: Decimal,
    pub wastage_pct: Decimal,
    pub misc_charges: Decimal,
    pub shipping_pct: Decimal,
    pub markup_pct: Decimal,
    pub tax_pct: Decimal,
}

impl PricingInputs {
    pub fn from_config(fields: &VariantConfigFields) -> Self {
        let z = |v: Option<Decimal>| v.unwrap_or(Decimal::ZERO);
        Self {
            weight: z(fields.weight),
            diamond_price: z(fields.diamond_price),
            moissanite_price: z(fields.moissanite_price),
            gemstone_price: z(fields.gemstone_price),
            making_charges: z(fields.making_charges),
            wastage_pct: z(fields.wastage_pct),
            misc_charges: z(fields.misc_charges),
            shipping_pct: z(fields.shipping_pct),
            markup_pct: z(fields.markup_pct),
            tax_pct: z(fields.tax_pct),
        }
    }

    /// `None` on overflow.
    fn stones(&self) -> Option<Decimal> {
        self.diamond_price
            .checked_add(self.moissanite_price)?
            .checked_add(self.gemstone_price)
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// One applied step of a calculation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceStep {
    pub label: &'static str,
    /// Amount this step added to the running total.
    pub added: Decimal,
    /// Running total after this step (unrounded).
    pub running_total: Decimal,
}

/// Full evaluation record for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTrace {
    pub formula: String,
    pub per_unit_price: Decimal,
    pub metal_cost: Decimal,
    pub steps: Vec<PriceStep>,
    /// `None` when an intermediate value overflowed `Decimal`.
    pub unrounded: Option<Decimal>,
    /// Final rounded price; zero when `unrounded` is `None`.
    pub price: Decimal,
}

/// Running-total accumulator. Once a step overflows the chain stays `None`
/// and later steps are skipped.
struct Chain {
    total: Option<Decimal>,
    steps: Vec<PriceStep>,
}

impl Chain {
    fn start(label: &'static str, value: Option<Decimal>) -> Self {
        let mut steps = Vec::with_capacity(8);
        if let Some(v) = value {
            steps.push(PriceStep {
                label,
                added: v,
                running_total: v,
            });
        }
        Self {
            total: value,
            steps,
        }
    }

    fn add(mut self, label: &'static str, amount: Option<Decimal>) -> Self {
        let next = match (self.total, amount) {
            (Some(t), Some(a)) => t.checked_add(a).map(|n| (a, n)),
            _ => None,
        };
        self.push(label, next);
        self
    }

    fn pct(mut self, label: &'static str, pct: Decimal) -> Self {
        let next = self.total.and_then(|t| {
            let added = t.checked_mul(pct)?.checked_div(Decimal::ONE_HUNDRED)?;
            Some((added, t.checked_add(added)?))
        });
        self.push(label, next);
        self
    }

    fn push(&mut self, label: &'static str, next: Option<(Decimal, Decimal)>) {
        match next {
            Some((added, total)) => {
                self.total = Some(total);
                self.steps.push(PriceStep {
                    label,
                    added,
                    running_total: total,
                });
            }
            None => self.total = None,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Round once, to an integer currency unit, midpoint away from zero.
pub fn round_price(value: Decimal) -> Decimal {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Evaluate `code` for one item and return the rounded price.
pub fn calculate_price(
    code: &FormulaCode,
    fields: &VariantConfigFields,
    snapshot: &SpotSnapshot,
) -> Decimal {
    calculate_with_trace(code, fields, snapshot).price
}

/// Evaluate `code` for one item, keeping every intermediate running total.
pub fn calculate_with_trace(
    code: &FormulaCode,
    fields: &VariantConfigFields,
    snapshot: &SpotSnapshot,
) -> PriceTrace {
    let inputs = PricingInputs::from_config(fields);
    let per_unit_price =
        snapshot.per_unit_price(fields.metal_type.as_deref(), fields.purity.as_deref());
    let metal_cost = per_unit_price.checked_mul(inputs.weight);

    let chain = match code {
        FormulaCode::One => {
            let start = metal_cost.zip(inputs.stones()).and_then(|(m, s)| m.checked_add(s));
            Chain::start("metal + stones", start)
                .pct("making %", inputs.making_charges)
                .pct("wastage %", inputs.wastage_pct)
                .pct("shipping %", inputs.shipping_pct)
                .add("misc", Some(inputs.misc_charges))
                .pct("markup %", inputs.markup_pct)
                .pct("tax %", inputs.tax_pct)
        }
        FormulaCode::Two => Chain::start("metal", metal_cost)
            .pct("making %", inputs.making_charges)
            .pct("wastage %", inputs.wastage_pct)
            .add("stones", inputs.stones())
            .pct("shipping %", inputs.shipping_pct)
            .add("misc", Some(inputs.misc_charges))
            .pct("markup %", inputs.markup_pct)
            .pct("tax %", inputs.tax_pct),
        FormulaCode::Three => Chain::start("metal", metal_cost)
            .pct("wastage %", inputs.wastage_pct)
            .add("making", Some(inputs.making_charges))
            .add("stones", inputs.stones())
            .pct("shipping %", inputs.shipping_pct)
            .add("misc", Some(inputs.misc_charges))
            .pct("markup %", inputs.markup_pct)
            .pct("tax %", inputs.tax_pct),
        FormulaCode::Four => Chain::start("metal", metal_cost)
            .pct("wastage %", inputs.wastage_pct)
            .add(
                "making x weight",
                inputs.making_charges.checked_mul(inputs.weight),
            )
            .add("stones", inputs.stones())
            .pct("shipping %", inputs.shipping_pct)
            .add("misc", Some(inputs.misc_charges))
            .pct("markup %", inputs.markup_pct)
            .pct("tax %", inputs.tax_pct),
        FormulaCode::Unrecognized(_) => {
            let start = metal_cost.zip(inputs.stones()).and_then(|(m, s)| m.checked_add(s));
            Chain::start("metal + stones", start)
        }
    };

    PriceTrace {
        formula: code.as_str().to_string(),
        per_unit_price,
        metal_cost: metal_cost.unwrap_or(Decimal::ZERO),
        steps: chain.steps,
        unrounded: chain.total,
        price: chain.total.map(round_price).unwrap_or(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpr_schemas::{GoldPurity, SpotBucket};
    use rust_decimal_macros::dec;

    /// per-unit 100 x weight 10 = metal cost 1000.
    fn snapshot() -> SpotSnapshot {
        SpotSnapshot::new()
            .with(SpotBucket::Gold(GoldPurity::K22), dec!(100))
            .with(SpotBucket::Silver, dec!(0.5))
    }

    fn charges() -> VariantConfigFields {
        VariantConfigFields {
            metal_type: Some("Gold".to_string()),
            purity: Some("22K".to_string()),
            weight: Some(dec!(10)),
            diamond_price: Some(dec!(500)),
            moissanite_price: Some(dec!(0)),
            gemstone_price: Some(dec!(0)),
            making_charges: Some(dec!(10)),
            wastage_pct: Some(dec!(5)),
            misc_charges: Some(dec!(100)),
            shipping_pct: Some(dec!(2)),
            markup_pct: Some(dec!(5)),
            tax_pct: Some(dec!(3)),
            ..Default::default()
        }
    }

    #[test]
    fn formula_one_matches_worked_trace() {
        let t = calculate_with_trace(&FormulaCode::One, &charges(), &snapshot());
        let totals: Vec<Decimal> = t.steps.iter().map(|s| s.running_total).collect();
        assert_eq!(
            totals,
            vec![
                dec!(1500),
                dec!(1650),
                dec!(1732.5),
                dec!(1767.15),
                dec!(1867.15),
                dec!(1960.5075),
                dec!(2018.322725),
            ]
        );
        assert_eq!(t.metal_cost, dec!(1000));
        assert_eq!(t.price, dec!(2018));
    }

    #[test]
    fn formula_two_applies_stones_after_making_and_wastage() {
        // 1000 -> 1100 -> 1155 -> 1655 -> 1688.1 -> 1788.1 -> 1877.505 -> 1933.83015
        let p = calculate_price(&FormulaCode::Two, &charges(), &snapshot());
        assert_eq!(p, dec!(1934));
    }

    #[test]
    fn formula_three_treats_making_as_flat() {
        // 1000 -> 1050 -> 1060 -> 1560 -> 1591.2 -> 1691.2 -> 1775.76 -> 1829.0328
        let p = calculate_price(&FormulaCode::Three, &charges(), &snapshot());
        assert_eq!(p, dec!(1829));
    }

    #[test]
    fn formula_four_scales_making_by_weight() {
        // 1000 -> 1050 -> 1150 -> 1650 -> 1683 -> 1783 -> 1872.15 -> 1928.3145
        let t = calculate_with_trace(&FormulaCode::Four, &charges(), &snapshot());
        assert_eq!(t.steps[2].label, "making x weight");
        assert_eq!(t.steps[2].added, dec!(100));
        assert_eq!(t.unrounded, Some(dec!(1928.3145)));
        assert_eq!(t.price, dec!(1928));
    }

    #[test]
    fn unrecognized_code_applies_no_charges() {
        let code = FormulaCode::parse("9");
        let t = calculate_with_trace(&code, &charges(), &snapshot());
        assert_eq!(t.steps.len(), 1);
        assert_eq!(t.price, dec!(1500));
    }

    #[test]
    fn unknown_metal_carries_only_non_metal_components() {
        let mut fields = charges();
        fields.metal_type = Some("copper".to_string());
        // 500 -> 550 -> 577.5 -> 589.05 -> 689.05 -> 723.5025 -> 745.207575
        let t = calculate_with_trace(&FormulaCode::One, &fields, &snapshot());
        assert_eq!(t.per_unit_price, Decimal::ZERO);
        assert_eq!(t.metal_cost, Decimal::ZERO);
        assert_eq!(t.price, dec!(745));
    }

    #[test]
    fn missing_numeric_fields_are_zero() {
        let fields = VariantConfigFields {
            metal_type: Some("gold".to_string()),
            purity: Some("22K".to_string()),
            weight: Some(dec!(2)),
            ..Default::default()
        };
        for code in ["1", "2", "3", "4", "x"] {
            let p = calculate_price(&FormulaCode::parse(code), &fields, &snapshot());
            assert_eq!(p, dec!(200), "formula {code}");
        }
        let empty = VariantConfigFields::default();
        assert_eq!(
            calculate_price(&FormulaCode::One, &empty, &snapshot()),
            Decimal::ZERO
        );
    }

    #[test]
    fn rounds_once_half_away_from_zero() {
        // silver 0.5 x 5 = 2.5
        let fields = VariantConfigFields {
            metal_type: Some("silver".to_string()),
            weight: Some(dec!(5)),
            ..Default::default()
        };
        assert_eq!(
            calculate_price(&FormulaCode::One, &fields, &snapshot()),
            dec!(3)
        );
        assert_eq!(round_price(dec!(2.4999)), dec!(2));
        assert_eq!(round_price(dec!(-2.5)), dec!(-3));
        assert_eq!(round_price(dec!(-0.2)).to_string(), "0");
    }

    #[test]
    fn evaluation_is_deterministic() {
        let a = calculate_with_trace(&FormulaCode::Three, &charges(), &snapshot());
        let b = calculate_with_trace(&FormulaCode::Three, &charges(), &snapshot());
        assert_eq!(a, b);
    }

    #[test]
    fn overflow_degrades_to_zero_without_panicking() {
        let snap = SpotSnapshot::new().with(SpotBucket::Silver, Decimal::MAX);
        let fields = VariantConfigFields {
            metal_type: Some("silver".to_string()),
            weight: Some(dec!(10)),
            ..Default::default()
        };
        let t = calculate_with_trace(&FormulaCode::One, &fields, &snap);
        assert_eq!(t.unrounded, None);
        assert_eq!(t.price, Decimal::ZERO);
    }
}
