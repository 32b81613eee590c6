//! Coupon eligibility and discount calculation.
//!
//! A coupon is checked against an order amount in a fixed order: existence,
//! minimum spend, global usage cap, per-user usage cap, expiry. The first
//! failing check decides the rejection, so a customer always sees the same
//! reason for the same coupon and cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{DiscountKind, round_money};

/// Why a coupon cannot be applied.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    #[error("Invalid coupon code.")]
    NotFound,
    #[error("Minimum order value for this coupon is Rs. {min}.")]
    BelowMinimum { min: Decimal },
    #[error("This coupon is no longer available.")]
    Exhausted,
    #[error("You have already used this coupon.")]
    UserLimitReached,
    #[error("This coupon has expired.")]
    Expired,
}

/// Problems with a coupon definition entered by an admin.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponDefinitionError {
    #[error("discount value must be greater than zero")]
    NonPositiveValue,
    #[error("percentage discount cannot exceed 100")]
    PercentOutOfRange,
    #[error("minimum amount cannot be negative")]
    NegativeMinimum,
    #[error("usage limits must be at least 1")]
    InvalidLimit,
}

/// The discount a coupon grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discount {
    /// `percent`% of the amount, capped at `cap` rupees when set.
    Percent { percent: Decimal, cap: Option<Decimal> },
    /// A fixed number of rupees.
    Flat(Decimal),
}

impl Discount {
    /// Build a discount from its stored columns.
    #[must_use]
    pub const fn from_parts(kind: DiscountKind, value: Decimal, cap: Option<Decimal>) -> Self {
        match kind {
            DiscountKind::Percent => Self::Percent {
                percent: value,
                cap,
            },
            DiscountKind::Flat => Self::Flat(value),
        }
    }

    /// Discount on `amount`, never more than `amount` itself.
    #[must_use]
    pub fn apply_to(&self, amount: Decimal) -> Decimal {
        let raw = match *self {
            Self::Percent { percent, cap } => {
                let value = amount * percent / Decimal::ONE_HUNDRED;
                cap.map_or(value, |cap| value.min(cap))
            }
            Self::Flat(value) => value,
        };
        round_money(raw.clamp(Decimal::ZERO, amount.max(Decimal::ZERO)))
    }
}

/// The stored state of a coupon that eligibility depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponRules {
    pub discount: Discount,
    pub min_amount: Decimal,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub per_user_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a successful eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CouponQuote {
    pub discount: Decimal,
    pub payable: Decimal,
}

impl CouponRules {
    /// Check the coupon against `amount` for a user who has redeemed it
    /// `user_redemptions` times before.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`CouponRejection`] in check order.
    pub fn evaluate(
        &self,
        amount: Decimal,
        user_redemptions: i64,
        now: DateTime<Utc>,
    ) -> Result<CouponQuote, CouponRejection> {
        if amount < self.min_amount {
            return Err(CouponRejection::BelowMinimum {
                min: self.min_amount,
            });
        }
        if self.max_uses.is_some_and(|max| self.times_used >= max) {
            return Err(CouponRejection::Exhausted);
        }
        if self
            .per_user_limit
            .is_some_and(|limit| user_redemptions >= i64::from(limit))
        {
            return Err(CouponRejection::UserLimitReached);
        }
        if self.expires_at.is_some_and(|expiry| now > expiry) {
            return Err(CouponRejection::Expired);
        }

        let discount = self.discount.apply_to(amount);
        Ok(CouponQuote {
            discount,
            payable: round_money(amount - discount),
        })
    }

    /// Validate a definition before it is stored.
    ///
    /// # Errors
    ///
    /// Returns an error for non-positive values, percentages above 100,
    /// negative minimums or limits below 1.
    pub fn validate_definition(&self) -> Result<(), CouponDefinitionError> {
        match self.discount {
            Discount::Percent { percent, cap } => {
                if percent <= Decimal::ZERO || cap.is_some_and(|c| c <= Decimal::ZERO) {
                    return Err(CouponDefinitionError::NonPositiveValue);
                }
                if percent > Decimal::ONE_HUNDRED {
                    return Err(CouponDefinitionError::PercentOutOfRange);
                }
            }
            Discount::Flat(value) => {
                if value <= Decimal::ZERO {
                    return Err(CouponDefinitionError::NonPositiveValue);
                }
            }
        }
        if self.min_amount < Decimal::ZERO {
            return Err(CouponDefinitionError::NegativeMinimum);
        }
        if self.max_uses.is_some_and(|n| n < 1) || self.per_user_limit.is_some_and(|n| n < 1) {
            return Err(CouponDefinitionError::InvalidLimit);
        }
        Ok(())
    }
}

/// Evaluate a possibly missing coupon.
///
/// # Errors
///
/// Returns [`CouponRejection::NotFound`] when `rules` is `None`, otherwise
/// whatever [`CouponRules::evaluate`] returns.
pub fn evaluate(
    rules: Option<&CouponRules>,
    amount: Decimal,
    user_redemptions: i64,
    now: DateTime<Utc>,
) -> Result<CouponQuote, CouponRejection> {
    rules
        .ok_or(CouponRejection::NotFound)?
        .evaluate(amount, user_redemptions, now)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn rules() -> CouponRules {
        CouponRules {
            discount: Discount::Percent {
                percent: d("10"),
                cap: Some(d("200")),
            },
            min_amount: d("1000"),
            max_uses: Some(100),
            times_used: 3,
            per_user_limit: Some(1),
            expires_at: Some(Utc::now() + Duration::days(7)),
        }
    }

    #[test]
    fn test_missing_coupon_is_not_found() {
        let result = evaluate(None, d("5000"), 0, Utc::now());
        assert_eq!(result, Err(CouponRejection::NotFound));
    }

    #[test]
    fn test_percent_discount() {
        let quote = rules().evaluate(d("1500"), 0, Utc::now()).unwrap();
        assert_eq!(quote.discount, d("150"));
        assert_eq!(quote.payable, d("1350"));
    }

    #[test]
    fn test_percent_discount_is_capped() {
        let quote = rules().evaluate(d("5000"), 0, Utc::now()).unwrap();
        assert_eq!(quote.discount, d("200"));
        assert_eq!(quote.payable, d("4800"));
    }

    #[test]
    fn test_flat_discount_never_exceeds_amount() {
        let coupon = CouponRules {
            discount: Discount::Flat(d("500")),
            min_amount: Decimal::ZERO,
            ..rules()
        };
        let quote = coupon.evaluate(d("300"), 0, Utc::now()).unwrap();
        assert_eq!(quote.discount, d("300"));
        assert_eq!(quote.payable, Decimal::ZERO);
    }

    #[test]
    fn test_below_minimum_message() {
        let err = rules().evaluate(d("999.99"), 0, Utc::now()).unwrap_err();
        assert_eq!(err, CouponRejection::BelowMinimum { min: d("1000") });
        assert_eq!(
            err.to_string(),
            "Minimum order value for this coupon is Rs. 1000."
        );
    }

    #[test]
    fn test_exhausted() {
        let coupon = CouponRules {
            times_used: 100,
            ..rules()
        };
        assert_eq!(
            coupon.evaluate(d("1500"), 0, Utc::now()),
            Err(CouponRejection::Exhausted)
        );
    }

    #[test]
    fn test_user_limit() {
        assert_eq!(
            rules().evaluate(d("1500"), 1, Utc::now()),
            Err(CouponRejection::UserLimitReached)
        );
    }

    #[test]
    fn test_expired() {
        let coupon = CouponRules {
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..rules()
        };
        assert_eq!(
            coupon.evaluate(d("1500"), 0, Utc::now()),
            Err(CouponRejection::Expired)
        );
    }

    #[test]
    fn test_checks_run_in_order() {
        // Every check fails; minimum spend is reported first.
        let coupon = CouponRules {
            times_used: 100,
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..rules()
        };
        assert!(matches!(
            coupon.evaluate(d("10"), 5, Utc::now()),
            Err(CouponRejection::BelowMinimum { .. })
        ));
        // With enough spend, the global cap wins over per-user and expiry.
        assert_eq!(
            coupon.evaluate(d("1500"), 5, Utc::now()),
            Err(CouponRejection::Exhausted)
        );
    }

    #[test]
    fn test_unlimited_coupon() {
        let coupon = CouponRules {
            max_uses: None,
            per_user_limit: None,
            expires_at: None,
            times_used: 10_000,
            ..rules()
        };
        assert!(coupon.evaluate(d("1500"), 50, Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_definition() {
        assert!(rules().validate_definition().is_ok());

        let over = CouponRules {
            discount: Discount::Percent {
                percent: d("150"),
                cap: None,
            },
            ..rules()
        };
        assert_eq!(
            over.validate_definition(),
            Err(CouponDefinitionError::PercentOutOfRange)
        );

        let zero = CouponRules {
            discount: Discount::Flat(Decimal::ZERO),
            ..rules()
        };
        assert_eq!(
            zero.validate_definition(),
            Err(CouponDefinitionError::NonPositiveValue)
        );

        let limit = CouponRules {
            per_user_limit: Some(0),
            ..rules()
        };
        assert_eq!(
            limit.validate_definition(),
            Err(CouponDefinitionError::InvalidLimit)
        );
    }
}
