//! Fixed-point money helpers.
//!
//! Every amount in the ledger is an `i64` count of minor units (kobo, cents).
//! Rates and penalties are basis points. Decimals only appear at provider
//! boundaries that speak major units.

use crate::error::LedgerError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

pub const MINOR_UNITS_SCALE: u32 = 2;
pub const BPS_DENOMINATOR: i64 = 10_000;

/// `12345` kobo -> `123.45`.
pub fn minor_to_major(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, MINOR_UNITS_SCALE)
}

/// `123.45` -> `12345`. Fails on sub-minor precision or overflow instead of rounding.
pub fn major_to_minor(amount: Decimal) -> Option<i64> {
    let scaled = amount.checked_mul(Decimal::from(100))?;
    if scaled.fract() != Decimal::ZERO {
        return None;
    }
    scaled.to_i64()
}

/// Parses a provider-formatted major-unit amount (`"5000"`, `"5000.5"`, `"5000.50"`).
pub fn parse_major_units(raw: &str) -> Option<i64> {
    Decimal::from_str(raw.trim()).ok().and_then(major_to_minor)
}

/// Two-decimal major-unit rendering for providers that take strings.
pub fn format_major_units(amount_minor: i64) -> String {
    minor_to_major(amount_minor).to_string()
}

/// `floor(amount * bps / 10_000)` computed in `i128`. A result outside
/// `i64` is `InvalidAmount`, never a wrapped value.
pub fn apply_bps(amount_minor: i64, bps: i64) -> Result<i64, LedgerError> {
    narrow(i128::from(amount_minor) * i128::from(bps) / i128::from(BPS_DENOMINATOR))
}

/// Brings a widened intermediate back to minor units.
pub fn narrow(value: i128) -> Result<i64, LedgerError> {
    i64::try_from(value).map_err(|_| LedgerError::InvalidAmount)
}
