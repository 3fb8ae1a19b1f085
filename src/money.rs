//! Money Conversion Module
//!
//! Orders carry their amount as integer minor units (fen for CNY). Gateways
//! speak in major units with two decimal places ("1.00"). All conversions
//! between the two go through this module and use `rust_decimal` so that no
//! amount ever passes through a float.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Minor units per major unit (CNY: 100 fen = 1 yuan)
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Smallest accepted order amount in minor units (0.01)
pub const MIN_ORDER_AMOUNT: i64 = 1;

/// Largest accepted order amount in minor units (1,000,000.00)
pub const MAX_ORDER_AMOUNT: i64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount {0} out of range [{MIN_ORDER_AMOUNT}, {MAX_ORDER_AMOUNT}]")]
    OutOfRange(i64),

    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),
}

/// Check an order amount against the accepted range.
pub fn validate_order_amount(minor_units: i64) -> Result<(), MoneyError> {
    if !(MIN_ORDER_AMOUNT..=MAX_ORDER_AMOUNT).contains(&minor_units) {
        return Err(MoneyError::OutOfRange(minor_units));
    }
    Ok(())
}

/// Convert minor units to an exact major-unit decimal (100 -> 1.00).
pub fn minor_to_major(minor_units: i64) -> Decimal {
    Decimal::new(minor_units, 2)
}

/// Render minor units as the gateway's fixed two-decimal money string.
///
/// ```rust
/// use epay_bridge::money::format_major;
/// assert_eq!(format_major(100), "1.00");
/// assert_eq!(format_major(1), "0.01");
/// ```
pub fn format_major(minor_units: i64) -> String {
    let value = minor_to_major(minor_units)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    format!("{:.2}", value)
}

/// Parse a gateway-reported money string into a decimal.
///
/// Accepts any plain decimal ("1", "1.0", "1.00"); comparison happens on the
/// numeric value so trailing zeros do not matter.
pub fn parse_major(amount_str: &str) -> Result<Decimal, MoneyError> {
    let trimmed = amount_str.trim();
    if trimmed.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    Decimal::from_str_exact(trimmed).map_err(|e| MoneyError::InvalidFormat(e.to_string()))
}

/// True when a gateway-reported money string equals the stored order amount.
pub fn amount_matches(minor_units: i64, reported: &str) -> Result<bool, MoneyError> {
    let reported = parse_major(reported)?;
    Ok(reported == minor_to_major(minor_units))
}

/// Shortest decimal rendering (1.00 -> "1", 12.50 -> "12.5").
///
/// The USDT gateway signs its numeric `amount` field in this form.
pub fn format_compact(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_major() {
        assert_eq!(format_major(100), "1.00");
        assert_eq!(format_major(1), "0.01");
        assert_eq!(format_major(12345), "123.45");
        assert_eq!(format_major(MAX_ORDER_AMOUNT), "1000000.00");
    }

    #[test]
    fn test_amount_matches_exact_decimal() {
        assert!(amount_matches(100, "1.00").unwrap());
        assert!(amount_matches(100, "1").unwrap());
        assert!(amount_matches(100, "1.0").unwrap());
        assert!(!amount_matches(100, "2.00").unwrap());
        assert!(!amount_matches(100, "0.99").unwrap());
        // 0.1 + 0.2 style float drift must not exist here
        assert!(amount_matches(30, "0.30").unwrap());
    }

    #[test]
    fn test_parse_major_rejects_garbage() {
        assert!(parse_major("").is_err());
        assert!(parse_major("abc").is_err());
        assert!(parse_major("1,00").is_err());
        assert!(amount_matches(100, "one").is_err());
    }

    #[test]
    fn test_validate_order_amount() {
        assert!(validate_order_amount(1).is_ok());
        assert!(validate_order_amount(MAX_ORDER_AMOUNT).is_ok());
        assert_eq!(validate_order_amount(0), Err(MoneyError::OutOfRange(0)));
        assert!(validate_order_amount(-5).is_err());
        assert!(validate_order_amount(MAX_ORDER_AMOUNT + 1).is_err());
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_compact(minor_to_major(100)), "1");
        assert_eq!(format_compact(minor_to_major(1250)), "12.5");
        assert_eq!(format_compact(minor_to_major(1)), "0.01");
    }
}
