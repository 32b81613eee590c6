//! Product management, including blocked products.

use axum::extract::{Multipart, Path, State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use strives_core::{
    CategoryId, CollectionId, ColourId, MaterialId, ProductId, Size, SubCategoryId, slugify,
};
use strives_db::ProductRepository;
use strives_db::products::{Product, ProductDetail, ProductFields};

use super::categories::{not_found, slug_for};
use super::images::read_files;
use crate::error::{AppError, EntityResultExt, Result};
use crate::extract::{JsonBody, ValidJson};
use crate::response::ApiResponse;
use crate::services::uploads::{self, ProductUploadReport};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200, message = "is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub collection_id: Option<CollectionId>,
    pub colour_id: Option<ColourId>,
    pub material_id: Option<MaterialId>,
    pub mrp: Decimal,
    pub sp: Decimal,
    #[serde(default)]
    pub available_sizes: Vec<String>,
    #[validate(range(min = 0, message = "cannot be negative"))]
    pub stocks_available: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sub_categories: Vec<SubCategoryId>,
}

impl ProductRequest {
    fn into_fields(self) -> Result<ProductFields> {
        if self.mrp <= Decimal::ZERO || self.sp <= Decimal::ZERO {
            return Err(AppError::BadRequest("Prices must be greater than zero.".to_owned()));
        }
        if self.sp > self.mrp {
            return Err(AppError::BadRequest(
                "Selling price cannot exceed the MRP.".to_owned(),
            ));
        }

        let mut available_sizes = Vec::with_capacity(self.available_sizes.len());
        for raw in &self.available_sizes {
            let size = Size::parse(raw)
                .map_err(|e| AppError::BadRequest(format!("available_sizes: {e}")))?;
            if !available_sizes.iter().any(|s: &String| s == size.as_str()) {
                available_sizes.push(size.as_str().to_owned());
            }
        }

        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| slugify(t))
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort_unstable();
        tags.dedup();

        let name = self.name.trim().to_owned();
        let slug = slug_for(&name)?;
        let mut sub_categories = self.sub_categories;
        sub_categories.sort_unstable_by_key(SubCategoryId::as_i32);
        sub_categories.dedup_by_key(|id| id.as_i32());

        Ok(ProductFields {
            name,
            slug,
            description: self.description.trim().to_owned(),
            category_id: self.category_id,
            collection_id: self.collection_id,
            colour_id: self.colour_id,
            material_id: self.material_id,
            mrp: self.mrp,
            sp: self.sp,
            available_sizes,
            stocks_available: self.stocks_available,
            tags,
            sub_categories,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductStatusRequest {
    pub blocked: bool,
}

#[derive(Debug, Serialize)]
pub struct ProductCount {
    pub count: i64,
}

#[instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_product(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ProductRequest>,
) -> Result<ApiResponse<ProductDetail>> {
    let fields = req.into_fields()?;
    let product = ProductRepository::new(state.pool())
        .create(&fields)
        .await
        .or_entity("Product", "Error adding product")?;
    tracing::info!(product_id = %product.product.id, "product created");
    Ok(ApiResponse::data(product).with_message("Product Added Successfully"))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<ProductDetail>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await
        .or_entity("Product", "Error fetching product")?
        .ok_or_else(|| not_found("Product"))?;
    Ok(ApiResponse::data(product))
}

#[instrument(skip(state, req))]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    ValidJson(req): ValidJson<ProductRequest>,
) -> Result<ApiResponse<ProductDetail>> {
    let fields = req.into_fields()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &fields)
        .await
        .or_entity("Product", "Error updating product")?;
    Ok(ApiResponse::data(product).with_message("Product Updated Successfully"))
}

/// Upload gallery images for a product. Files that fail are skipped and
/// listed in `data.failed`.
#[instrument(skip(state, multipart))]
pub async fn upload_product_images(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<ApiResponse<ProductUploadReport>> {
    let files = read_files(&mut multipart, "images").await?;
    if files.is_empty() {
        return Err(AppError::BadRequest("No images provided.".to_owned()));
    }

    // Unknown product ids would otherwise fail once per file.
    ProductRepository::new(state.pool())
        .get(id)
        .await
        .or_entity("Product", "Error updating product images")?
        .ok_or_else(|| not_found("Product"))?;

    let report = uploads::store_product_images(state.storage(), state.pool(), id, files).await;
    let message = if report.failed.is_empty() {
        "Product Images Updated Successfully"
    } else {
        "Some images could not be uploaded"
    };
    Ok(ApiResponse::data(report).with_message(message))
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> Result<ApiResponse<Vec<Product>>> {
    let products = ProductRepository::new(state.pool())
        .list_all()
        .await
        .or_entity("Product", "Error fetching products")?;
    Ok(ApiResponse::data(products))
}

#[instrument(skip(state))]
pub async fn count_products(State(state): State<AppState>) -> Result<ApiResponse<ProductCount>> {
    let count = ProductRepository::new(state.pool())
        .count()
        .await
        .or_entity("Product", "Error fetching products")?;
    Ok(ApiResponse::data(ProductCount { count }))
}

#[instrument(skip(state, req), fields(blocked = req.blocked))]
pub async fn set_product_status(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    JsonBody(req): JsonBody<ProductStatusRequest>,
) -> Result<ApiResponse<Product>> {
    let product = ProductRepository::new(state.pool())
        .set_blocked(id, req.blocked)
        .await
        .or_entity("Product", "Error updating product status")?;
    let message = if req.blocked {
        "Product Blocked Successfully"
    } else {
        "Product Unblocked Successfully"
    };
    Ok(ApiResponse::data(product).with_message(message))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<()>> {
    ProductRepository::new(state.pool())
        .delete(id)
        .await
        .or_entity("Product", "Error deleting product")?;
    Ok(ApiResponse::message("Product Deleted Successfully"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn request() -> ProductRequest {
        serde_json::from_value(serde_json::json!({
            "name": " Block Print Kurta ",
            "description": "Hand block printed cotton.",
            "mrp": "2499",
            "sp": "1999",
            "available_sizes": ["m", "L", "M", ""],
            "stocks_available": 12,
            "tags": ["Cotton Kurta", "festive", "cotton-kurta", "!!"],
            "sub_categories": [3]
        }))
        .unwrap()
    }

    #[test]
    fn test_fields_are_normalized() {
        let fields = request().into_fields().unwrap();
        assert_eq!(fields.name, "Block Print Kurta");
        assert_eq!(fields.slug.as_str(), "block-print-kurta");
        assert_eq!(fields.available_sizes, vec!["M", "L", "FREE"]);
        assert_eq!(fields.tags, vec!["cotton-kurta", "festive"]);
        assert_eq!(fields.mrp, dec("2499"));
    }

    #[test]
    fn test_sub_categories_are_deduplicated() {
        let mut req = request();
        req.sub_categories = [4, 2, 4, 9, 2].into_iter().map(SubCategoryId::new).collect();
        let ids: Vec<i32> = req
            .into_fields()
            .unwrap()
            .sub_categories
            .iter()
            .map(SubCategoryId::as_i32)
            .collect();
        assert_eq!(ids, vec![2, 4, 9]);
    }

    #[test]
    fn test_selling_price_above_mrp_is_rejected() {
        let mut req = request();
        req.sp = dec("2999");
        assert!(matches!(req.into_fields(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_zero_price_is_rejected() {
        let mut req = request();
        req.mrp = Decimal::ZERO;
        assert!(req.into_fields().is_err());
    }

    #[test]
    fn test_bad_size_is_rejected() {
        let mut req = request();
        req.available_sizes = vec!["X L".to_owned()];
        assert!(req.into_fields().is_err());
    }
}
