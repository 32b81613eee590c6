//! Products, their sub-category links and image galleries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use strives_core::catalog::{ProductQuery, SortDirection, SortField};
use strives_core::{
    CategoryId, CollectionId, ColourId, ImageId, MaterialId, ProductId, Slug, SubCategoryId,
    discount_percent,
};

use super::RepositoryError;

/// What the storefront shows in listings, carts and wishlists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub mrp: Decimal,
    pub sp: Decimal,
    #[sqlx(skip)]
    pub discount: i32,
    pub available_sizes: Vec<String>,
    pub stocks_available: i32,
    pub thumbnail: Option<String>,
}

impl ProductSummary {
    pub(crate) fn with_discount(mut self) -> Self {
        self.discount = discount_percent(self.mrp, self.sp);
        self
    }
}

/// Columns of [`ProductSummary`] for a query aliasing `strives.product` as `p`.
pub(crate) const SUMMARY_COLUMNS: &str = "p.id, p.name, p.slug, p.mrp, p.sp,
    p.available_sizes, p.stocks_available,
    (SELECT i.url FROM strives.product_image pi
       JOIN strives.image i ON i.id = pi.image_id
      WHERE pi.product_id = p.id
      ORDER BY pi.position, pi.image_id
      LIMIT 1) AS thumbnail";

/// A product row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub collection_id: Option<CollectionId>,
    pub colour_id: Option<ColourId>,
    pub material_id: Option<MaterialId>,
    pub mrp: Decimal,
    pub sp: Decimal,
    #[sqlx(skip)]
    pub discount: i32,
    pub available_sizes: Vec<String>,
    pub stocks_available: i32,
    pub tags: Vec<String>,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    fn with_discount(mut self) -> Self {
        self.discount = discount_percent(self.mrp, self.sp);
        self
    }
}

const PRODUCT_COLUMNS: &str = "id, name, slug, description, category_id, collection_id,
    colour_id, material_id, mrp, sp, available_sizes, stocks_available, tags, is_blocked,
    created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GalleryImage {
    pub image_id: ImageId,
    pub url: String,
    pub position: i32,
}

/// A product with its sub-categories and gallery.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub sub_categories: Vec<SubCategoryId>,
    pub images: Vec<GalleryImage>,
}

/// Editable fields of a product.
#[derive(Debug, Clone)]
pub struct ProductFields {
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub category_id: Option<CategoryId>,
    pub collection_id: Option<CollectionId>,
    pub colour_id: Option<ColourId>,
    pub material_id: Option<MaterialId>,
    pub mrp: Decimal,
    pub sp: Decimal,
    pub available_sizes: Vec<String>,
    pub stocks_available: i32,
    pub tags: Vec<String>,
    pub sub_categories: Vec<SubCategoryId>,
}

fn sort_expression(field: SortField) -> &'static str {
    match field {
        SortField::SellingPrice => "p.sp",
        SortField::Mrp => "p.mrp",
        SortField::Name => "p.name",
        SortField::CreatedAt => "p.created_at",
        SortField::Discount => "((p.mrp - p.sp) / NULLIF(p.mrp, 0))",
    }
}

/// Build the storefront listing query. Blocked products are always excluded.
fn listing_query(query: &ProductQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {SUMMARY_COLUMNS} FROM strives.product p WHERE NOT p.is_blocked"
    ));

    if let Some(category) = query.category {
        qb.push(" AND p.category_id = ").push_bind(category);
    }
    if let Some(slug) = &query.sub_category {
        qb.push(
            " AND EXISTS (SELECT 1 FROM strives.product_sub_category psc
               JOIN strives.sub_category sc ON sc.id = psc.sub_category_id
              WHERE psc.product_id = p.id AND sc.slug = ",
        )
        .push_bind(slug.clone())
        .push(")");
    }
    if !query.keywords.is_empty() {
        qb.push(" AND p.tags @> ").push_bind(query.keywords.clone());
    }
    if let Some(material) = query.material {
        qb.push(" AND p.material_id = ").push_bind(material);
    }
    if let Some(min) = query.min_price {
        qb.push(" AND p.sp >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND p.sp <= ").push_bind(max);
    }

    let direction = match query.sort.direction {
        SortDirection::Ascending => " ASC NULLS LAST",
        SortDirection::Descending => " DESC NULLS LAST",
    };
    qb.push(" ORDER BY ")
        .push(sort_expression(query.sort.field))
        .push(direction)
        .push(", p.id DESC");
    qb
}

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Storefront listing filtered and sorted per `query`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_visible(
        &self,
        query: &ProductQuery,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let mut qb = listing_query(query);
        let rows = qb
            .build_query_as::<ProductSummary>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(ProductSummary::with_discount).collect())
    }

    /// Whether a product exists and is not blocked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_visible(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let visible = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM strives.product WHERE id = $1 AND NOT is_blocked)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(visible)
    }

    /// A product with its gallery, hidden when blocked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_visible(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        Ok(self.get(id).await?.filter(|d| !d.product.is_blocked))
    }

    /// A product with its sub-categories and gallery, blocked or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<ProductDetail>, RepositoryError> {
        let Some(product) = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM strives.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let sub_categories = sqlx::query_scalar::<_, SubCategoryId>(
            "SELECT sub_category_id FROM strives.product_sub_category
             WHERE product_id = $1 ORDER BY sub_category_id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let images = sqlx::query_as::<_, GalleryImage>(
            "SELECT pi.image_id, i.url, pi.position
             FROM strives.product_image pi
             JOIN strives.image i ON i.id = pi.image_id
             WHERE pi.product_id = $1
             ORDER BY pi.position, pi.image_id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(ProductDetail {
            product: product.with_discount(),
            sub_categories,
            images,
        }))
    }

    /// Every product including blocked ones, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM strives.product ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Product::with_discount).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM strives.product")
            .fetch_one(self.pool)
            .await?;
        Ok(n)
    }

    /// Create a product and link its sub-categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if a referenced taxonomy row
    /// doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, fields: &ProductFields) -> Result<ProductDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, ProductId>(
            "INSERT INTO strives.product
                 (name, slug, description, category_id, collection_id, colour_id, material_id,
                  mrp, sp, available_sizes, stocks_available, tags)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.description)
        .bind(fields.category_id)
        .bind(fields.collection_id)
        .bind(fields.colour_id)
        .bind(fields.material_id)
        .bind(fields.mrp)
        .bind(fields.sp)
        .bind(&fields.available_sizes)
        .bind(fields.stocks_available)
        .bind(&fields.tags)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "product"))?;

        link_sub_categories(&mut tx, id, &fields.sub_categories).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product or a referenced
    /// taxonomy row doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<ProductDetail, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE strives.product
             SET name = $2, slug = $3, description = $4, category_id = $5, collection_id = $6,
                 colour_id = $7, material_id = $8, mrp = $9, sp = $10, available_sizes = $11,
                 stocks_available = $12, tags = $13, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(&fields.description)
        .bind(fields.category_id)
        .bind(fields.collection_id)
        .bind(fields.colour_id)
        .bind(fields.material_id)
        .bind(fields.mrp)
        .bind(fields.sp)
        .bind(&fields.available_sizes)
        .bind(fields.stocks_available)
        .bind(&fields.tags)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "product"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("DELETE FROM strives.product_sub_category WHERE product_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_sub_categories(&mut tx, id, &fields.sub_categories).await?;
        tx.commit().await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Block or unblock a product on the storefront.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn set_blocked(&self, id: ProductId, blocked: bool) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE strives.product SET is_blocked = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(blocked)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(product.with_discount())
    }

    /// Delete a product. Its images stay in the asset library.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn link_sub_categories(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    product_id: ProductId,
    sub_categories: &[SubCategoryId],
) -> Result<(), RepositoryError> {
    if sub_categories.is_empty() {
        return Ok(());
    }
    let ids: Vec<i32> = sub_categories.iter().map(SubCategoryId::as_i32).collect();
    sqlx::query(
        "INSERT INTO strives.product_sub_category (product_id, sub_category_id)
         SELECT $1, UNNEST($2::INTEGER[])
         ON CONFLICT DO NOTHING",
    )
    .bind(product_id)
    .bind(ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| RepositoryError::constraint_violation(e, "product sub-category"))?;
    Ok(())
}
