//! Wishlist of the signed-in user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::instrument;

use strives_core::ProductId;
use strives_db::favourites::FavouriteView;
use strives_db::{FavouriteRepository, ProductRepository, RepositoryError};

use crate::error::{AppError, Result, ResultExt};
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

const FAILURE: &str = "Error updating wishlist";

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn list_favourites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Vec<FavouriteView>>> {
    let favourites = FavouriteRepository::new(state.pool())
        .list(user_id)
        .await
        .or_status(StatusCode::BAD_GATEWAY, "Error fetching wishlist")?;
    Ok(ApiResponse::data(favourites))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn add_favourite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<i32>,
) -> Result<ApiResponse<()>> {
    let product_id = ProductId::new(product_id);
    let visible = ProductRepository::new(state.pool())
        .is_visible(product_id)
        .await
        .or_status(StatusCode::BAD_GATEWAY, FAILURE)?;
    if !visible {
        return Err(AppError::NotFound("Product not found".to_owned()));
    }

    match FavouriteRepository::new(state.pool())
        .add(user_id, product_id)
        .await
    {
        Ok(_) => Ok(ApiResponse::message("Product successfully added to wishlist")),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound("Product not found".to_owned())),
        Err(e) => Err(e).or_status(StatusCode::BAD_GATEWAY, FAILURE),
    }
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn remove_favourite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(product_id): Path<i32>,
) -> Result<ApiResponse<()>> {
    FavouriteRepository::new(state.pool())
        .remove(user_id, ProductId::new(product_id))
        .await
        .or_status(StatusCode::BAD_GATEWAY, FAILURE)?;
    Ok(ApiResponse::message("Product removed from wishlist"))
}

#[instrument(skip(state), fields(user_id = %user_id))]
pub async fn clear_favourites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<()>> {
    FavouriteRepository::new(state.pool())
        .clear(user_id)
        .await
        .or_status(StatusCode::BAD_GATEWAY, FAILURE)?;
    Ok(ApiResponse::message("Wishlist cleared."))
}
