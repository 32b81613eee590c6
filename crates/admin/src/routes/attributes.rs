//! Tags, materials and colours.

use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use strives_core::{ColourId, MaterialId, Slug, TagId};
use strives_db::AttributeRepository;
use strives_db::attributes::{Colour, Material, Tag};

use crate::error::{AppError, EntityResultExt, Result};
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct TagRequest {
    #[validate(length(min = 1, max = 50, message = "is required"))]
    pub tag: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MaterialRequest {
    #[validate(length(min = 1, max = 50, message = "is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ColourRequest {
    #[validate(length(min = 1, max = 50, message = "is required"))]
    pub name: String,
    pub hex: Option<String>,
}

/// Accept `#rgb` or `#rrggbb` (the `#` is optional) and store `#rrggbb`
/// lower-cased. Blank means no swatch.
fn normalize_hex(hex: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = hex.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let digits = raw.strip_prefix('#').unwrap_or(raw);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::BadRequest("Invalid colour hex code.".to_owned()));
    }
    let expanded = match digits.len() {
        6 => digits.to_ascii_lowercase(),
        3 => digits
            .chars()
            .flat_map(|c| [c, c])
            .collect::<String>()
            .to_ascii_lowercase(),
        _ => return Err(AppError::BadRequest("Invalid colour hex code.".to_owned())),
    };
    Ok(Some(format!("#{expanded}")))
}

#[instrument(skip(state, req), fields(tag = %req.tag))]
pub async fn create_tag(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<TagRequest>,
) -> Result<ApiResponse<Tag>> {
    let name = Slug::parse(&req.tag).map_err(|e| AppError::BadRequest(format!("tag: {e}")))?;
    let tag = AttributeRepository::new(state.pool())
        .create_tag(&name)
        .await
        .or_entity("Tag", "Error adding tag")?;
    Ok(ApiResponse::created(tag, "Tag Added Successfully"))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> Result<ApiResponse<Vec<Tag>>> {
    let tags = AttributeRepository::new(state.pool())
        .list_tags()
        .await
        .or_entity("Tag", "Error fetching tags")?;
    Ok(ApiResponse::data(tags))
}

#[instrument(skip(state))]
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
) -> Result<ApiResponse<()>> {
    AttributeRepository::new(state.pool())
        .delete_tag(id)
        .await
        .or_entity("Tag", "Error deleting tag")?;
    Ok(ApiResponse::message("Tag Deleted Successfully"))
}

#[instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_material(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<MaterialRequest>,
) -> Result<ApiResponse<Material>> {
    let material = AttributeRepository::new(state.pool())
        .create_material(req.name.trim())
        .await
        .or_entity("Material", "Error adding material")?;
    Ok(ApiResponse::data(material).with_message("Material Added Successfully"))
}

#[instrument(skip(state))]
pub async fn list_materials(State(state): State<AppState>) -> Result<ApiResponse<Vec<Material>>> {
    let materials = AttributeRepository::new(state.pool())
        .list_materials()
        .await
        .or_entity("Material", "Error fetching materials")?;
    Ok(ApiResponse::data(materials))
}

#[instrument(skip(state))]
pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<MaterialId>,
) -> Result<ApiResponse<()>> {
    AttributeRepository::new(state.pool())
        .delete_material(id)
        .await
        .or_entity("Material", "Error deleting material")?;
    Ok(ApiResponse::message("Material Deleted Successfully"))
}

#[instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_colour(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ColourRequest>,
) -> Result<ApiResponse<Colour>> {
    let hex = normalize_hex(req.hex.as_deref())?;
    let colour = AttributeRepository::new(state.pool())
        .create_colour(req.name.trim(), hex.as_deref())
        .await
        .or_entity("Colour", "Error adding colour")?;
    Ok(ApiResponse::data(colour).with_message("Colour Added Successfully"))
}

#[instrument(skip(state))]
pub async fn list_colours(State(state): State<AppState>) -> Result<ApiResponse<Vec<Colour>>> {
    let colours = AttributeRepository::new(state.pool())
        .list_colours()
        .await
        .or_entity("Colour", "Error fetching colours")?;
    Ok(ApiResponse::data(colours))
}

#[instrument(skip(state))]
pub async fn delete_colour(
    State(state): State<AppState>,
    Path(id): Path<ColourId>,
) -> Result<ApiResponse<()>> {
    AttributeRepository::new(state.pool())
        .delete_colour(id)
        .await
        .or_entity("Colour", "Error deleting colour")?;
    Ok(ApiResponse::message("Colour Deleted Successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_normalized() {
        assert_eq!(normalize_hex(Some("#A1B2C3")).unwrap().as_deref(), Some("#a1b2c3"));
        assert_eq!(normalize_hex(Some("fff")).unwrap().as_deref(), Some("#ffffff"));
    }

    #[test]
    fn test_blank_hex_means_none() {
        assert_eq!(normalize_hex(None).unwrap(), None);
        assert_eq!(normalize_hex(Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_bad_hex_is_rejected() {
        assert!(normalize_hex(Some("#12345")).is_err());
        assert!(normalize_hex(Some("#ggg")).is_err());
    }
}
