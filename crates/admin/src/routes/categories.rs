//! Categories and their sub-categories.

use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use strives_core::{CategoryId, Slug, SubCategoryId};
use strives_db::CategoryRepository;
use strives_db::categories::{Category, SubCategory};

use crate::error::{AppError, EntityResultExt, Result};
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubCategoryRequest {
    pub category_id: CategoryId,
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
}

/// Slug derived from a display name.
pub(crate) fn slug_for(name: &str) -> Result<Slug> {
    Slug::parse(name).map_err(|e| AppError::BadRequest(format!("name: {e}")))
}

fn description(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_category(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<CategoryRequest>,
) -> Result<ApiResponse<Category>> {
    let name = req.name.trim();
    let slug = slug_for(name)?;
    let category = CategoryRepository::new(state.pool())
        .create(name, &slug, description(req.description.as_deref()))
        .await
        .or_entity("Category", "Error adding category")?;
    Ok(ApiResponse::data(category).with_message("Category Added Successfully"))
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> Result<ApiResponse<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool())
        .list()
        .await
        .or_entity("Category", "Error fetching categories")?;
    Ok(ApiResponse::data(categories))
}

#[instrument(skip(state))]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<ApiResponse<Category>> {
    let category = CategoryRepository::new(state.pool())
        .get(id)
        .await
        .or_entity("Category", "Error fetching category")?
        .ok_or_else(|| not_found("Category"))?;
    Ok(ApiResponse::data(category))
}

#[instrument(skip(state, req))]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    ValidJson(req): ValidJson<CategoryRequest>,
) -> Result<ApiResponse<Category>> {
    let name = req.name.trim();
    let slug = slug_for(name)?;
    let category = CategoryRepository::new(state.pool())
        .update(id, name, &slug, description(req.description.as_deref()))
        .await
        .or_entity("Category", "Error updating category")?;
    Ok(ApiResponse::data(category).with_message("Category Updated Successfully"))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<ApiResponse<()>> {
    CategoryRepository::new(state.pool())
        .delete(id)
        .await
        .or_entity("Category", "Error deleting category")?;
    Ok(ApiResponse::message("Category Deleted Successfully"))
}

#[instrument(skip(state, req), fields(category_id = %req.category_id, name = %req.name))]
pub async fn create_sub_category(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SubCategoryRequest>,
) -> Result<ApiResponse<SubCategory>> {
    let name = req.name.trim();
    let slug = slug_for(name)?;
    let sub_category = CategoryRepository::new(state.pool())
        .create_sub_category(req.category_id, name, &slug)
        .await
        .or_entity("Sub-category", "Error adding sub-category")?;
    Ok(ApiResponse::data(sub_category).with_message("Sub-category Added Successfully"))
}

#[instrument(skip(state))]
pub async fn list_sub_categories(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<SubCategory>>> {
    let sub_categories = CategoryRepository::new(state.pool())
        .list_sub_categories(None)
        .await
        .or_entity("Sub-category", "Error fetching sub-categories")?;
    Ok(ApiResponse::data(sub_categories))
}

#[instrument(skip(state))]
pub async fn get_sub_category(
    State(state): State<AppState>,
    Path(id): Path<SubCategoryId>,
) -> Result<ApiResponse<SubCategory>> {
    let sub_category = CategoryRepository::new(state.pool())
        .get_sub_category(id)
        .await
        .or_entity("Sub-category", "Error fetching sub-category")?
        .ok_or_else(|| not_found("Sub-category"))?;
    Ok(ApiResponse::data(sub_category))
}

#[instrument(skip(state, req))]
pub async fn update_sub_category(
    State(state): State<AppState>,
    Path(id): Path<SubCategoryId>,
    ValidJson(req): ValidJson<SubCategoryRequest>,
) -> Result<ApiResponse<SubCategory>> {
    let name = req.name.trim();
    let slug = slug_for(name)?;
    let sub_category = CategoryRepository::new(state.pool())
        .update_sub_category(id, req.category_id, name, &slug)
        .await
        .or_entity("Sub-category", "Error updating sub-category")?;
    Ok(ApiResponse::data(sub_category).with_message("Sub-category Updated Successfully"))
}

#[instrument(skip(state))]
pub async fn delete_sub_category(
    State(state): State<AppState>,
    Path(id): Path<SubCategoryId>,
) -> Result<ApiResponse<()>> {
    CategoryRepository::new(state.pool())
        .delete_sub_category(id)
        .await
        .or_entity("Sub-category", "Error deleting sub-category")?;
    Ok(ApiResponse::message("Sub-category Deleted Successfully"))
}

/// 404 for a lookup that found nothing.
pub(crate) fn not_found(entity: &str) -> AppError {
    AppError::status(
        axum::http::StatusCode::NOT_FOUND,
        format!("{entity} not found"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_from_display_name() {
        assert_eq!(slug_for("Kurta Sets").unwrap().as_str(), "kurta-sets");
    }

    #[test]
    fn test_name_without_letters_is_rejected() {
        assert!(matches!(slug_for("!!!"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_blank_description_is_dropped() {
        assert_eq!(description(Some("   ")), None);
        assert_eq!(description(Some(" Festive ")), Some("Festive"));
    }
}
