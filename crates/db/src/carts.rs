//! Per-user carts.
//!
//! Every mutation locks the owning `app_user` row first, so concurrent
//! requests from one user apply one after another instead of overwriting
//! each other's quantities.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use strives_core::cart::{Cart, CartChange, CartLine};
use strives_core::{ProductId, Size, UserId};

use super::RepositoryError;
use super::products::{ProductSummary, SUMMARY_COLUMNS};

/// A cart line joined with the product it refers to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLineView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: ProductSummary,
    pub size: Size,
    pub quantity: i32,
}

#[derive(sqlx::FromRow)]
struct CartRow {
    product_id: ProductId,
    size: Size,
    quantity: i32,
}

impl TryFrom<CartRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative cart quantity {}", row.quantity))
        })?;
        Ok(Self {
            product_id: row.product_id,
            size: row.size,
            quantity,
        })
    }
}

fn quantity_column(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {quantity} out of range")))
}

/// Lock the user's row, serializing cart changes for that user.
pub(crate) async fn lock_owner(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM strives.app_user WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(())
}

/// Fail with `NotFound` unless every product exists and is not blocked.
async fn ensure_visible(conn: &mut PgConnection, ids: &[ProductId]) -> Result<(), RepositoryError> {
    let mut ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    ids.sort_unstable();
    ids.dedup();

    let visible = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM strives.product WHERE id = ANY($1) AND NOT is_blocked",
    )
    .bind(&ids)
    .fetch_one(&mut *conn)
    .await?;

    if usize::try_from(visible).ok() != Some(ids.len()) {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Load the user's cart inside an open transaction.
pub(crate) async fn load_cart(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Cart, RepositoryError> {
    let rows = sqlx::query_as::<_, CartRow>(
        "SELECT product_id, size, quantity FROM strives.cart_item
         WHERE user_id = $1
         ORDER BY added_at, product_id, size",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let lines = rows
        .into_iter()
        .map(CartLine::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Cart::from_lines(lines))
}

/// Repository for carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart joined with product details, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartLineView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineView>(&format!(
            "SELECT {SUMMARY_COLUMNS}, c.size, c.quantity
             FROM strives.cart_item c
             JOIN strives.product p ON p.id = c.product_id
             WHERE c.user_id = $1
             ORDER BY c.added_at, c.product_id, c.size"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|mut line| {
                line.product = line.product.with_discount();
                line
            })
            .collect())
    }

    /// Add a product in a size, or set the quantity of the existing line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist or the
    /// product doesn't exist or is blocked.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn upsert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size: Size,
        quantity: u32,
    ) -> Result<CartChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;
        ensure_visible(&mut tx, &[product_id]).await?;

        let mut cart = load_cart(&mut tx, user_id).await?;
        let change = cart.upsert(product_id, size, quantity);
        let line = change.line();

        match &change {
            CartChange::Added(_) => {
                sqlx::query(
                    "INSERT INTO strives.cart_item (user_id, product_id, size, quantity)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(user_id)
                .bind(line.product_id)
                .bind(&line.size)
                .bind(quantity_column(line.quantity)?)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::constraint_violation(e, "cart line"))?;
            }
            CartChange::Updated { .. } => {
                sqlx::query(
                    "UPDATE strives.cart_item SET quantity = $4
                     WHERE user_id = $1 AND product_id = $2 AND size = $3",
                )
                .bind(user_id)
                .bind(line.product_id)
                .bind(&line.size)
                .bind(quantity_column(line.quantity)?)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(change)
    }

    /// Remove a product from the cart, in every size or only in `size`.
    ///
    /// Returns the number of lines removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
        size: Option<&Size>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM strives.cart_item
             WHERE user_id = $1 AND product_id = $2 AND ($3::TEXT IS NULL OR size = $3)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(size)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Replace the whole cart with `cart`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist or a
    /// product doesn't exist or is blocked.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn replace(&self, user_id: UserId, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;
        if !cart.is_empty() {
            let ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
            ensure_visible(&mut tx, &ids).await?;
        }

        sqlx::query("DELETE FROM strives.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if !cart.is_empty() {
            let products: Vec<i32> = cart.lines().iter().map(|l| l.product_id.as_i32()).collect();
            let sizes: Vec<String> = cart.lines().iter().map(|l| l.size.to_string()).collect();
            let quantities = cart
                .lines()
                .iter()
                .map(|l| quantity_column(l.quantity))
                .collect::<Result<Vec<_>, _>>()?;

            // Offsetting added_at keeps the submitted order on read-back.
            sqlx::query(
                "INSERT INTO strives.cart_item (user_id, product_id, size, quantity, added_at)
                 SELECT $1, t.product_id, t.size, t.quantity, NOW() + (t.ord * INTERVAL '1 microsecond')
                 FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::INTEGER[])
                      WITH ORDINALITY AS t(product_id, size, quantity, ord)",
            )
            .bind(user_id)
            .bind(products)
            .bind(sizes)
            .bind(quantities)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::constraint_violation(e, "cart line"))?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
