//! Coupon eligibility check at checkout.

use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use strives_core::Slug;
use strives_core::coupon::{self, CouponRejection};
use strives_db::CouponRepository;

use crate::error::{Result, ResultExt};
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CouponCheckRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub code: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CouponCheck {
    pub code: Slug,
    pub discount: Decimal,
    pub payable: Decimal,
}

#[instrument(skip(state, req), fields(user_id = %user_id, code = %req.code))]
pub async fn check_coupon(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<CouponCheckRequest>,
) -> Result<ApiResponse<CouponCheck>> {
    // A code that can't be a slug can't be stored either.
    let code = Slug::parse(&req.code).map_err(|_| CouponRejection::NotFound)?;

    let coupons = CouponRepository::new(state.pool());
    let coupon = coupons
        .get_by_code(&code)
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error checking coupon")?;

    let redemptions = match &coupon {
        Some(coupon) => coupons
            .redemptions_by_user(coupon.id, user_id)
            .await
            .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error checking coupon")?,
        None => 0,
    };

    let rules = coupon.as_ref().map(|c| c.rules());
    let quote = coupon::evaluate(rules.as_ref(), req.amount, redemptions, Utc::now())?;

    Ok(ApiResponse::data(CouponCheck {
        code,
        discount: quote.discount,
        payable: quote.payable,
    }))
}
