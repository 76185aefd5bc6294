//! mpr-pricing
//!
//! Price Calculation Engine.
//!
//! Pure, deterministic logic. No IO, no clock, no catalog calls. Given a
//! formula code, one item's configuration and a spot-price snapshot it
//! produces a rounded price. The engine never fails: unknown metals, unknown
//! purities, unknown formula codes and missing numeric fields all degrade to
//! zero contributions. Deciding whether a price is usable is the caller's job.

mod engine;
mod snapshot;

pub use engine::{
    calculate_price, calculate_with_trace, round_price, PriceStep, PriceTrace, PricingInputs,
};
pub use snapshot::SpotSnapshot;
