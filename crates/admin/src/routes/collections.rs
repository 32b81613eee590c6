//! Curated collections.

use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use strives_core::{CollectionId, ImageId};
use strives_db::CollectionRepository;
use strives_db::collections::{Collection, CollectionFields};

use super::categories::{not_found, slug_for};
use crate::error::{EntityResultExt, Result};
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CollectionRequest {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
    pub description: Option<String>,
    /// Cover image from the asset library.
    pub image_id: Option<ImageId>,
}

#[instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_collection(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CollectionRequest>,
) -> Result<ApiResponse<Collection>> {
    let name = req.name.trim();
    let slug = slug_for(name)?;
    let fields = CollectionFields {
        name,
        slug: &slug,
        description: req.description.as_deref().filter(|s| !s.trim().is_empty()),
        image_id: req.image_id,
    };
    let collection = CollectionRepository::new(state.pool())
        .create(&fields)
        .await
        .or_entity("Collection", "Error adding collection")?;
    Ok(ApiResponse::data(collection).with_message("Collection Added Successfully"))
}

#[instrument(skip(state, req))]
pub async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<CollectionId>,
    ValidJson(req): ValidJson<CollectionRequest>,
) -> Result<ApiResponse<Collection>> {
    let name = req.name.trim();
    let slug = slug_for(name)?;
    let fields = CollectionFields {
        name,
        slug: &slug,
        description: req.description.as_deref().filter(|s| !s.trim().is_empty()),
        image_id: req.image_id,
    };
    let collection = CollectionRepository::new(state.pool())
        .update(id, &fields)
        .await
        .or_entity("Collection", "Error updating collection")?;
    Ok(ApiResponse::data(collection).with_message("Collection Updated Successfully"))
}

#[instrument(skip(state))]
pub async fn list_collections(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Collection>>> {
    let collections = CollectionRepository::new(state.pool())
        .list()
        .await
        .or_entity("Collection", "Error fetching collections")?;
    Ok(ApiResponse::data(collections))
}

#[instrument(skip(state))]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<CollectionId>,
) -> Result<ApiResponse<Collection>> {
    let collection = CollectionRepository::new(state.pool())
        .get(id)
        .await
        .or_entity("Collection", "Error fetching collection")?
        .ok_or_else(|| not_found("Collection"))?;
    Ok(ApiResponse::data(collection))
}

#[instrument(skip(state))]
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(id): Path<CollectionId>,
) -> Result<ApiResponse<()>> {
    CollectionRepository::new(state.pool())
        .delete(id)
        .await
        .or_entity("Collection", "Error deleting collection")?;
    Ok(ApiResponse::message("Collection Deleted Successfully"))
}
