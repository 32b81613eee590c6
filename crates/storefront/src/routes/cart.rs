//! Cart of the signed-in user.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use strives_core::cart::{Cart, CartChange, CartLine, normalize_quantity};
use strives_core::{ProductId, Size};
use strives_db::carts::CartLineView;
use strives_db::{CartRepository, RepositoryError};

use crate::error::{AppError, Result, ResultExt};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const FAILURE: &str = "Error updating cart";

/// One submitted cart line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: i32,
    pub quantity: Option<i64>,
    pub size: Option<String>,
}

impl CartItemRequest {
    /// Apply the defaults: quantity 1 and the free size.
    ///
    /// # Errors
    ///
    /// Returns 400 for an oversized quantity or a malformed size.
    pub fn into_line(self) -> Result<CartLine> {
        let quantity =
            normalize_quantity(self.quantity).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let size = Size::parse_optional(self.size.as_deref())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok(CartLine {
            product_id: ProductId::new(self.product_id),
            size,
            quantity,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoveParams {
    pub size: Option<String>,
}

fn not_found_or(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound("Product not found".to_owned()),
        other => AppError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: FAILURE.into(),
            source: Some(Box::new(other)),
        },
    }
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn get_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Vec<CartLineView>>> {
    let lines = CartRepository::new(state.pool())
        .list(user_id)
        .await
        .or_status(StatusCode::BAD_GATEWAY, "Error fetching cart")?;
    Ok(ApiResponse::data(lines))
}

#[instrument(skip(state, req), fields(user_id = %user_id, product_id = req.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<CartItemRequest>,
) -> Result<ApiResponse<()>> {
    let line = req.into_line()?;
    let change = CartRepository::new(state.pool())
        .upsert(user_id, line.product_id, line.size, line.quantity)
        .await
        .map_err(not_found_or)?;

    if let CartChange::Updated { previous, line } = &change {
        debug!(previous, quantity = line.quantity, "cart line quantity set");
    }
    Ok(ApiResponse::message("Product successfully added to cart"))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<i32>,
    Query(params): Query<RemoveParams>,
) -> Result<ApiResponse<()>> {
    let size = params
        .size
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(Size::parse)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    CartRepository::new(state.pool())
        .remove(user_id, ProductId::new(product_id), size.as_ref())
        .await
        .or_status(StatusCode::BAD_GATEWAY, FAILURE)?;
    Ok(ApiResponse::message("Product removed from cart"))
}

#[instrument(skip(state, items), fields(user_id = %user_id, lines = items.len()))]
pub async fn replace_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    JsonBody(items): JsonBody<Vec<CartItemRequest>>,
) -> Result<ApiResponse<()>> {
    let lines = items
        .into_iter()
        .map(CartItemRequest::into_line)
        .collect::<Result<Vec<_>>>()?;
    let cart = Cart::replaced_with(lines);

    CartRepository::new(state.pool())
        .replace(user_id, &cart)
        .await
        .map_err(not_found_or)?;
    Ok(ApiResponse::message("Cart updated successfully."))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn clear_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<()>> {
    CartRepository::new(state.pool())
        .clear(user_id)
        .await
        .or_status(StatusCode::BAD_GATEWAY, FAILURE)?;
    Ok(ApiResponse::message("Cart cleared."))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_camel_case() {
        let req: CartItemRequest =
            serde_json::from_str(r#"{"productId": 7, "quantity": 2, "size": "xl"}"#).unwrap();
        let line = req.into_line().unwrap();
        assert_eq!(line.product_id, ProductId::new(7));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.size.as_str(), "XL");
    }

    #[test]
    fn test_defaults_applied() {
        let req: CartItemRequest = serde_json::from_str(r#"{"productId": 7}"#).unwrap();
        let line = req.into_line().unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(line.size, Size::free());
    }

    #[test]
    fn test_zero_quantity_becomes_one() {
        let req: CartItemRequest =
            serde_json::from_str(r#"{"productId": 7, "quantity": 0}"#).unwrap();
        assert_eq!(req.into_line().unwrap().quantity, 1);
    }

    #[test]
    fn test_bad_size_rejected() {
        let req: CartItemRequest =
            serde_json::from_str(r#"{"productId": 7, "size": "x-l"}"#).unwrap();
        assert!(req.into_line().is_err());
    }
}
