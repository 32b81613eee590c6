//! Rupee amounts.
//!
//! Money is carried as [`Decimal`] rupees with two decimal places. Razorpay
//! wants integer paise, which is the only place amounts leave that form.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount is too large")]
    Overflow,
}

/// Round to paise using banker's rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Convert a rupee amount to integer paise.
///
/// # Errors
///
/// Returns an error if the amount is zero, negative or does not fit in `i64`.
pub fn to_paise(amount: Decimal) -> Result<i64, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive);
    }
    let paise = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(MoneyError::Overflow)?
        .round();
    paise.to_i64().ok_or(MoneyError::Overflow)
}

/// Whole-number discount percentage of `sp` against `mrp`.
///
/// Returns 0 when there is no markdown or the MRP is not positive.
#[must_use]
pub fn discount_percent(mrp: Decimal, sp: Decimal) -> i32 {
    if mrp <= Decimal::ZERO || sp >= mrp {
        return 0;
    }
    let pct = ((mrp - sp) * Decimal::ONE_HUNDRED / mrp).round();
    pct.to_i32().unwrap_or(0).clamp(0, 100)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_to_paise() {
        assert_eq!(to_paise(d("1499.00")).unwrap(), 149_900);
        assert_eq!(to_paise(d("0.5")).unwrap(), 50);
        assert_eq!(to_paise(d("10.005")).unwrap(), 1000);
    }

    #[test]
    fn test_to_paise_rejects_non_positive() {
        assert_eq!(to_paise(Decimal::ZERO), Err(MoneyError::NotPositive));
        assert_eq!(to_paise(d("-1")), Err(MoneyError::NotPositive));
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(discount_percent(d("2000"), d("1500")), 25);
        assert_eq!(discount_percent(d("999"), d("666")), 33);
        assert_eq!(discount_percent(d("1000"), d("1000")), 0);
        assert_eq!(discount_percent(d("1000"), d("1200")), 0);
        assert_eq!(discount_percent(Decimal::ZERO, d("10")), 0);
    }
}
