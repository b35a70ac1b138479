//! Money calculation utilities using rust_decimal for precision
//!
//! Prices and totals are stored as `f64`; every sum, product and comparison
//! is done on `Decimal` and converted back rounded to 2 decimal places.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for comparing client-claimed amounts (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Round to 2 decimal places
#[inline]
pub fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `unit_price × quantity`
pub fn line_total(unit_price: f64, quantity: i64) -> Decimal {
    round(to_decimal(unit_price) * Decimal::from(quantity))
}

/// True when `claimed` is within [`MONEY_TOLERANCE`] of `expected`
pub fn within_tolerance(expected: Decimal, claimed: f64) -> bool {
    (expected - to_decimal(claimed)).abs() <= MONEY_TOLERANCE
}

/// Amount must be finite, not negative and representable as a `Decimal`
pub fn is_valid_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0 && Decimal::from_f64(value).is_some()
}
