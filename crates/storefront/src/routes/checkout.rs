//! Razorpay checkout and orders.
//!
//! The browser first asks for a Razorpay order (`POST /payment/order`),
//! priced here from the cart, pays it with Razorpay checkout, then submits
//! the returned ids and signature to `POST /order`. The order is only
//! written once the signature checks out and Razorpay reports the order
//! paid in full for the current cart total.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{Instrument, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use strives_core::coupon::CouponRejection;
use strives_core::{Slug, round_money};
use strives_db::orders::{OrderQuote, OrderView, PlaceOrder, PlaceOrderError};
use strives_db::{OrderRepository, RepositoryError, UserRepository};
use strives_integrations::RazorpayOrder;

use crate::error::{AppError, Result, ResultExt};
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::notifications;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PaymentCredentials {
    pub key_id: String,
}

/// The amount is what the client believes it owes. The charge itself is
/// always the cart total computed here.
#[derive(Debug, Deserialize, Validate)]
pub struct PaymentOrderRequest {
    pub amount: Option<Decimal>,
    pub coupon: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    pub status: bool,
    pub order: RazorpayOrder,
    pub quote: OrderQuote,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    pub coupon: Option<String>,
    #[validate(length(min = 1, message = "is required"))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1, message = "is required"))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1, message = "is required"))]
    pub razorpay_signature: String,
}

/// Public Razorpay key for the checkout widget.
pub async fn payment_credentials(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> ApiResponse<PaymentCredentials> {
    ApiResponse::data(PaymentCredentials {
        key_id: state.payments().key_id().to_owned(),
    })
}

fn coupon_slug(code: Option<&str>) -> Result<Option<Slug>> {
    code.filter(|c| !c.trim().is_empty())
        .map(|c| Slug::parse(c).map_err(|_| AppError::Coupon(CouponRejection::NotFound)))
        .transpose()
}

#[instrument(skip(state, req), fields(user_id = %user_id))]
pub async fn create_payment_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<PaymentOrderRequest>,
) -> Result<axum::Json<PaymentOrderResponse>> {
    let coupon = coupon_slug(req.coupon.as_deref())?;
    let quote = OrderRepository::new(state.pool())
        .quote(user_id, coupon.as_ref(), chrono::Utc::now())
        .await
        .map_err(place_order_error)?;

    if req.amount.is_some_and(|amount| round_money(amount) != quote.total) {
        warn!(claimed = ?req.amount, total = %quote.total, "payment amount differs from cart");
        return Err(AppError::BadRequest(
            "Order amount does not match your cart.".to_owned(),
        ));
    }

    let receipt = Uuid::new_v4().to_string();
    let order = state
        .payments()
        .create_order(quote.total, &receipt)
        .await
        .or_status(StatusCode::NOT_IMPLEMENTED, "Error Placing Order")?;

    info!(razorpay_order_id = %order.id, total = %quote.total, "payment order created");
    Ok(axum::Json(PaymentOrderResponse {
        status: true,
        order,
        quote,
    }))
}

fn place_order_error(e: PlaceOrderError) -> AppError {
    match e {
        PlaceOrderError::EmptyCart => AppError::BadRequest("Your cart is empty.".to_owned()),
        PlaceOrderError::UnavailableProduct(id) => {
            AppError::BadRequest(format!("Product {id} is no longer available."))
        }
        PlaceOrderError::AmountMismatch { .. } => {
            AppError::BadRequest("Payment amount does not match the order total.".to_owned())
        }
        PlaceOrderError::Amount(_) => {
            AppError::BadRequest("Order total must be greater than zero.".to_owned())
        }
        PlaceOrderError::Coupon(rejection) => AppError::Coupon(rejection),
        PlaceOrderError::Repository(RepositoryError::Conflict(_)) => AppError::status(
            StatusCode::CONFLICT,
            "This payment has already been used for an order.",
        ),
        PlaceOrderError::Repository(e) => AppError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Error placing order".into(),
            source: Some(Box::new(e)),
        },
    }
}

/// Verify the payment, then turn the cart into an order.
#[instrument(skip(state, req), fields(user_id = %user_id, razorpay_order_id = %req.razorpay_order_id))]
pub async fn place_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<PlaceOrderRequest>,
) -> Result<ApiResponse<OrderView>> {
    if let Err(e) = state.payments().verify_payment_signature(
        &req.razorpay_order_id,
        &req.razorpay_payment_id,
        &req.razorpay_signature,
    ) {
        warn!(error = %e, "payment verification failed");
        return Err(AppError::BadRequest("Payment verification failed.".to_owned()));
    }

    let payment = state
        .payments()
        .fetch_order(&req.razorpay_order_id)
        .await
        .or_status(StatusCode::BAD_GATEWAY, "Error verifying payment")?;
    if !payment.is_paid() {
        warn!(status = %payment.status, amount_paid = payment.amount_paid, "payment not captured");
        return Err(AppError::BadRequest("Payment has not been completed.".to_owned()));
    }

    let coupon = coupon_slug(req.coupon.as_deref())?;

    let order = OrderRepository::new(state.pool())
        .place(&PlaceOrder {
            user_id,
            coupon_code: coupon.as_ref(),
            razorpay_order_id: &req.razorpay_order_id,
            razorpay_payment_id: &req.razorpay_payment_id,
            amount_paid: payment.amount_paid,
            now: chrono::Utc::now(),
        })
        .await
        .map_err(place_order_error)?;

    info!(order_id = %order.order.id, total = %order.order.total, "order placed");

    match UserRepository::new(state.pool()).get_by_id(user_id).await {
        Ok(Some(user)) => {
            let state = state.clone();
            let notified = order.clone();
            tokio::spawn(
                async move { notifications::order_placed(&state, &user, &notified).await }
                    .in_current_span(),
            );
        }
        Ok(None) => warn!("order placed for a user that no longer exists"),
        Err(e) => warn!(error = %e, "could not load user for order notifications"),
    }

    Ok(ApiResponse::data(order).with_message("Order placed successfully."))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Vec<OrderView>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user_id)
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching orders")?;
    Ok(ApiResponse::data(orders))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn test_empty_cart_is_bad_request() {
        let response = place_order_error(PlaceOrderError::EmptyCart).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_coupon_rejection_keeps_its_status() {
        let response =
            place_order_error(PlaceOrderError::Coupon(CouponRejection::Expired)).into_response();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[test]
    fn test_underpayment_is_bad_request() {
        let err = PlaceOrderError::AmountMismatch {
            due: 1_000_000,
            paid: 100,
        };
        let response = place_order_error(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_blank_coupon_is_ignored() {
        assert!(coupon_slug(Some("  ")).unwrap().is_none());
        assert_eq!(coupon_slug(Some("Diwali 20")).unwrap().unwrap().as_str(), "diwali-20");
    }

    #[test]
    fn test_reused_payment_is_conflict() {
        let err = PlaceOrderError::Repository(RepositoryError::Conflict("order".to_owned()));
        assert_eq!(place_order_error(err).into_response().status(), StatusCode::CONFLICT);
    }
}
