//! Conversion between decimal amounts and the integer minor units the
//! stores persist.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;

use crate::ValidationError;

/// Convert an amount to cents. Anything beyond two decimals is rounded,
/// midpoints away from zero.
pub fn to_cents(amount: Decimal) -> Result<i64, ValidationError> {
    amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| ValidationError::out_of_range("amount", "does not fit in minor units"))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn cents_roundtrip() {
        let amount = Decimal::from_str("100.50").unwrap();
        assert_eq!(to_cents(amount).unwrap(), 10050);
        assert_eq!(from_cents(10050), amount);
        assert_eq!(to_cents(Decimal::from_str("0.01").unwrap()).unwrap(), 1);
        assert_eq!(
            to_cents(Decimal::from_str("999999999.99").unwrap()).unwrap(),
            99_999_999_999
        );
    }

    #[test]
    fn huge_amounts_are_out_of_range() {
        assert!(matches!(
            to_cents(Decimal::MAX),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(to_cents(Decimal::MIN).is_err());
    }
}
