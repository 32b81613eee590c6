//! Coupon definitions.

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use strives_core::coupon::{CouponRules, Discount};
use strives_core::{CouponId, DiscountKind, Slug};
use strives_db::CouponRepository;
use strives_db::coupons::{Coupon, CouponFields};

use crate::error::{AppError, EntityResultExt, Result};
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CouponRequest {
    #[validate(length(min = 1, max = 50, message = "is required"))]
    pub code: String,
    pub description: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_amount: Decimal,
    pub max_uses: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponRequest {
    fn into_fields(self) -> Result<CouponFields> {
        let code =
            Slug::parse(&self.code).map_err(|e| AppError::BadRequest(format!("code: {e}")))?;
        // A cap only means something for percentage discounts.
        let max_discount = match self.discount_kind {
            DiscountKind::Percent => self.max_discount,
            DiscountKind::Flat => None,
        };

        CouponRules {
            discount: Discount::from_parts(self.discount_kind, self.discount_value, max_discount),
            min_amount: self.min_amount,
            max_uses: self.max_uses,
            times_used: 0,
            per_user_limit: self.per_user_limit,
            expires_at: self.expires_at,
        }
        .validate_definition()
        .map_err(|e| AppError::BadRequest(format!("Invalid coupon: {e}.")))?;

        Ok(CouponFields {
            code,
            description: self.description.filter(|s| !s.trim().is_empty()),
            discount_kind: self.discount_kind,
            discount_value: self.discount_value,
            max_discount,
            min_amount: self.min_amount,
            max_uses: self.max_uses,
            per_user_limit: self.per_user_limit,
            expires_at: self.expires_at,
        })
    }
}

#[instrument(skip(state, req), fields(code = %req.code))]
pub async fn create_coupon(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CouponRequest>,
) -> Result<ApiResponse<Coupon>> {
    let fields = req.into_fields()?;
    let coupon = CouponRepository::new(state.pool())
        .create(&fields)
        .await
        .or_entity("Coupon", "Error adding coupon")?;
    Ok(ApiResponse::data(coupon).with_message("Coupon Added Successfully"))
}

#[instrument(skip(state))]
pub async fn list_coupons(State(state): State<AppState>) -> Result<ApiResponse<Vec<Coupon>>> {
    let coupons = CouponRepository::new(state.pool())
        .list()
        .await
        .or_entity("Coupon", "Error fetching coupons")?;
    Ok(ApiResponse::data(coupons))
}

#[instrument(skip(state, req))]
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
    ValidJson(req): ValidJson<CouponRequest>,
) -> Result<ApiResponse<Coupon>> {
    let fields = req.into_fields()?;
    let coupon = CouponRepository::new(state.pool())
        .update(id, &fields)
        .await
        .or_entity("Coupon", "Error updating coupon")?;
    Ok(ApiResponse::data(coupon).with_message("Coupon Updated Successfully"))
}

#[instrument(skip(state))]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<CouponId>,
) -> Result<ApiResponse<()>> {
    CouponRepository::new(state.pool())
        .delete(id)
        .await
        .or_entity("Coupon", "Error deleting coupon")?;
    Ok(ApiResponse::message("Coupon Deleted Successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(value: serde_json::Value) -> CouponRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_code_is_slugified() {
        let fields = request(serde_json::json!({
            "code": "Diwali 20",
            "discount_kind": "percent",
            "discount_value": "20",
            "max_discount": "500"
        }))
        .into_fields()
        .unwrap();
        assert_eq!(fields.code.as_str(), "diwali-20");
        assert_eq!(fields.min_amount, Decimal::ZERO);
        assert!(fields.max_discount.is_some());
    }

    #[test]
    fn test_flat_coupon_drops_cap() {
        let fields = request(serde_json::json!({
            "code": "FLAT100",
            "discount_kind": "flat",
            "discount_value": "100",
            "max_discount": "50"
        }))
        .into_fields()
        .unwrap();
        assert_eq!(fields.max_discount, None);
    }

    #[test]
    fn test_percent_over_hundred_is_rejected() {
        let result = request(serde_json::json!({
            "code": "TOOMUCH",
            "discount_kind": "percent",
            "discount_value": "120"
        }))
        .into_fields();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_zero_usage_limit_is_rejected() {
        let result = request(serde_json::json!({
            "code": "NOUSE",
            "discount_kind": "flat",
            "discount_value": "50",
            "max_uses": 0
        }))
        .into_fields();
        assert!(result.is_err());
    }
}
