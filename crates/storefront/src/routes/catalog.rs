//! Product listing and the read-only taxonomy used by storefront filters.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use strives_core::catalog::{ProductFilterParams, ProductQuery};
use strives_core::{CategoryId, CollectionId, ProductId};
use strives_db::products::{ProductDetail, ProductSummary};
use strives_db::{
    AttributeRepository, CategoryRepository, CollectionRepository, ProductRepository,
};

use crate::error::{AppError, Result, ResultExt};
use crate::response::ApiResponse;
use crate::services::taxonomy::TaxonomyKey;
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductFilterParams>,
) -> Result<ApiResponse<Vec<ProductSummary>>> {
    let query = ProductQuery::parse(&params).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let products = ProductRepository::new(state.pool())
        .list_visible(&query)
        .await
        .or_status(StatusCode::SERVICE_UNAVAILABLE, "Error fetching products")?;
    Ok(ApiResponse::data(products))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<ProductDetail>> {
    let product = ProductRepository::new(state.pool())
        .get_visible(ProductId::new(id))
        .await
        .or_status(StatusCode::SERVICE_UNAVAILABLE, "Error fetching product")?
        .ok_or_else(|| AppError::NotFound("Product not found".to_owned()))?;
    Ok(ApiResponse::data(product))
}

#[derive(Debug, Deserialize)]
pub struct SubCategoryParams {
    pub category: Option<i32>,
}

pub async fn list_categories(State(state): State<AppState>) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::Categories, || async move {
            CategoryRepository::new(pool).list().await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching categories")?;
    Ok(ApiResponse::data(value))
}

pub async fn list_sub_categories(
    State(state): State<AppState>,
    Query(params): Query<SubCategoryParams>,
) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let category = params.category.map(CategoryId::new);
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::SubCategories(category), || async move {
            CategoryRepository::new(pool).list_sub_categories(category).await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching sub-categories")?;
    Ok(ApiResponse::data(value))
}

pub async fn list_collections(State(state): State<AppState>) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::Collections, || async move {
            CollectionRepository::new(pool).list().await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching collections")?;
    Ok(ApiResponse::data(value))
}

pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let id = CollectionId::new(id);
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::Collection(id), || async move {
            CollectionRepository::new(pool).get(id).await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching collection")?;
    if value.is_null() {
        return Err(AppError::NotFound("Collection not found".to_owned()));
    }
    Ok(ApiResponse::data(value))
}

pub async fn list_colours(State(state): State<AppState>) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::Colours, || async move {
            AttributeRepository::new(pool).list_colours().await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching colours")?;
    Ok(ApiResponse::data(value))
}

pub async fn list_materials(State(state): State<AppState>) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::Materials, || async move {
            AttributeRepository::new(pool).list_materials().await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching materials")?;
    Ok(ApiResponse::data(value))
}

pub async fn list_tags(State(state): State<AppState>) -> Result<ApiResponse<Value>> {
    let pool = state.pool();
    let value = state
        .taxonomy()
        .get_or_load(TaxonomyKey::Tags, || async move {
            AttributeRepository::new(pool).list_tags().await
        })
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching tags")?;
    Ok(ApiResponse::data(value))
}
