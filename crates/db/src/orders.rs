//! Orders, their line items and order placement.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use strives_core::cart::{self, CartLine};
use strives_core::coupon::CouponRejection;
use strives_core::{
    CouponId, Email, MoneyError, OrderId, OrderItemId, OrderStatus, Phone, ProductId, Size, Slug,
    UserId, to_paise,
};

use super::RepositoryError;
use super::addresses::AddressFields;
use super::carts::{load_cart, lock_owner};
use super::coupons::{lock_by_code, redemptions_by_user};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_id: Option<CouponId>,
    pub shipping_address: Option<Json<AddressFields>>,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub name: String,
    pub size: Size,
    pub quantity: i32,
    pub unit_price: Decimal,
}

/// An order with its items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Contact details of the customer who placed an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderCustomer {
    #[sqlx(rename = "customer_name")]
    pub name: String,
    #[sqlx(rename = "customer_email")]
    pub email: Email,
    #[sqlx(rename = "customer_phone")]
    pub phone: Option<Phone>,
}

/// An order as the back office sees it.
#[derive(Debug, Clone, Serialize)]
pub struct AdminOrderView {
    #[serde(flatten)]
    pub order: OrderView,
    pub customer: OrderCustomer,
}

#[derive(sqlx::FromRow)]
struct AdminOrderRow {
    #[sqlx(flatten)]
    order: Order,
    #[sqlx(flatten)]
    customer: OrderCustomer,
}

/// A verified payment to turn into an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder<'a> {
    pub user_id: UserId,
    pub coupon_code: Option<&'a Slug>,
    pub razorpay_order_id: &'a str,
    pub razorpay_payment_id: &'a str,
    /// Amount captured on the Razorpay order, in paise.
    pub amount_paid: i64,
    pub now: DateTime<Utc>,
}

/// What the user's cart costs right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderQuote {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("product {0} is no longer available")]
    UnavailableProduct(ProductId),

    #[error("paid {paid} paise but the order comes to {due} paise")]
    AmountMismatch { due: i64, paid: i64 },

    #[error(transparent)]
    Amount(#[from] MoneyError),

    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

#[derive(Clone, sqlx::FromRow)]
struct PricedProduct {
    id: ProductId,
    name: String,
    sp: Decimal,
    is_blocked: bool,
}

struct PricedCart {
    lines: Vec<(CartLine, PricedProduct)>,
    coupon_id: Option<CouponId>,
    quote: OrderQuote,
}

/// Price the user's cart and apply the coupon, inside an open transaction.
async fn price_cart(
    conn: &mut PgConnection,
    user_id: UserId,
    coupon_code: Option<&Slug>,
    now: DateTime<Utc>,
) -> Result<PricedCart, PlaceOrderError> {
    let cart = load_cart(&mut *conn, user_id).await?;
    if cart.is_empty() {
        return Err(PlaceOrderError::EmptyCart);
    }

    let product_ids: Vec<i32> = cart.lines().iter().map(|l| l.product_id.as_i32()).collect();
    let products: HashMap<ProductId, PricedProduct> = sqlx::query_as::<_, PricedProduct>(
        "SELECT id, name, sp, is_blocked FROM strives.product WHERE id = ANY($1)",
    )
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|p| (p.id, p))
    .collect();

    let mut lines = Vec::with_capacity(cart.lines().len());
    for line in cart.lines() {
        match products.get(&line.product_id) {
            Some(p) if !p.is_blocked => lines.push((line.clone(), p.clone())),
            _ => return Err(PlaceOrderError::UnavailableProduct(line.product_id)),
        }
    }
    let subtotal = cart::subtotal(lines.iter().map(|(line, p)| (line, p.sp)));

    let (coupon_id, discount, total) = match coupon_code {
        Some(code) => {
            let coupon = lock_by_code(&mut *conn, code)
                .await?
                .ok_or(CouponRejection::NotFound)?;
            let used = redemptions_by_user(&mut *conn, coupon.id, user_id).await?;
            let quote = coupon.rules().evaluate(subtotal, used, now)?;
            (Some(coupon.id), quote.discount, quote.payable)
        }
        None => (None, Decimal::ZERO, subtotal),
    };

    Ok(PricedCart {
        lines,
        coupon_id,
        quote: OrderQuote {
            subtotal,
            discount,
            total,
        },
    })
}

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.status, o.subtotal, o.discount, o.total,
    o.coupon_id, o.shipping_address, o.razorpay_order_id, o.razorpay_payment_id,
    o.created_at, o.updated_at";

async fn attach_items(
    conn: &mut PgConnection,
    orders: Vec<Order>,
) -> Result<Vec<OrderView>, RepositoryError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i32> = orders.iter().map(|o| o.id.as_i32()).collect();
    let items = sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, product_id, name, size, quantity, unit_price
         FROM strives.order_item
         WHERE order_id = ANY($1)
         ORDER BY id",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;

    let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderView {
            items: by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

fn quantity_column(line: &CartLine) -> Result<i32, RepositoryError> {
    i32::try_from(line.quantity).map_err(|_| {
        RepositoryError::DataCorruption(format!("quantity {} out of range", line.quantity))
    })
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price the user's cart, with the coupon applied, without changing it.
    ///
    /// # Errors
    ///
    /// Returns the same pricing failures as [`OrderRepository::place`], and
    /// `PlaceOrderError::Amount` when the total is not payable.
    pub async fn quote(
        &self,
        user_id: UserId,
        coupon_code: Option<&Slug>,
        now: DateTime<Utc>,
    ) -> Result<OrderQuote, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;
        let priced = price_cart(&mut tx, user_id, coupon_code, now).await?;
        to_paise(priced.quote.total)?;
        tx.rollback().await?;
        Ok(priced.quote)
    }

    /// Turn the user's cart into an order.
    ///
    /// Pricing the cart, redeeming the coupon, writing the order and
    /// clearing the cart happen in one transaction. The user row and the
    /// coupon row are locked so concurrent checkouts cannot double-spend a
    /// coupon or lose cart changes. Nothing is written unless
    /// `amount_paid` equals the order total.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::EmptyCart` for an empty cart,
    /// `PlaceOrderError::UnavailableProduct` if a line's product is gone or
    /// blocked, `PlaceOrderError::Coupon` if the coupon is rejected,
    /// `PlaceOrderError::AmountMismatch` if the payment doesn't cover the
    /// order exactly, and `RepositoryError::Conflict` if the payment was
    /// already used.
    pub async fn place(&self, request: &PlaceOrder<'_>) -> Result<OrderView, PlaceOrderError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, request.user_id).await?;

        let PricedCart {
            lines: priced,
            coupon_id,
            quote:
                OrderQuote {
                    subtotal,
                    discount,
                    total,
                },
        } = price_cart(&mut tx, request.user_id, request.coupon_code, request.now).await?;

        let due = to_paise(total)?;
        if due != request.amount_paid {
            return Err(PlaceOrderError::AmountMismatch {
                due,
                paid: request.amount_paid,
            });
        }

        let shipping_address = sqlx::query_as::<_, AddressFields>(
            "SELECT name, phone, line1, line2, city, state, pincode, landmark
             FROM strives.address WHERE user_id = $1",
        )
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Json);

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO strives.customer_order AS o
                 (user_id, subtotal, discount, total, coupon_id, shipping_address,
                  razorpay_order_id, razorpay_payment_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING o.id, o.user_id, o.status, o.subtotal, o.discount, o.total,
                 o.coupon_id, o.shipping_address, o.razorpay_order_id, o.razorpay_payment_id,
                 o.created_at, o.updated_at",
        )
        .bind(request.user_id)
        .bind(subtotal)
        .bind(discount)
        .bind(total)
        .bind(coupon_id)
        .bind(shipping_address)
        .bind(request.razorpay_order_id)
        .bind(request.razorpay_payment_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "order for this payment"))?;

        let mut names = Vec::with_capacity(priced.len());
        let mut ids = Vec::with_capacity(priced.len());
        let mut sizes = Vec::with_capacity(priced.len());
        let mut quantities = Vec::with_capacity(priced.len());
        let mut prices = Vec::with_capacity(priced.len());
        for (line, product) in &priced {
            ids.push(line.product_id.as_i32());
            names.push(product.name.clone());
            sizes.push(line.size.to_string());
            quantities.push(quantity_column(line)?);
            prices.push(product.sp);
        }

        sqlx::query(
            "INSERT INTO strives.order_item (order_id, product_id, name, size, quantity, unit_price)
             SELECT $1, t.product_id, t.name, t.size, t.quantity, t.unit_price
             FROM UNNEST($2::INTEGER[], $3::TEXT[], $4::TEXT[], $5::INTEGER[], $6::NUMERIC[])
                  AS t(product_id, name, size, quantity, unit_price)",
        )
        .bind(order.id)
        .bind(ids)
        .bind(names)
        .bind(sizes)
        .bind(quantities)
        .bind(prices)
        .execute(&mut *tx)
        .await?;

        if let Some(coupon_id) = coupon_id {
            sqlx::query("UPDATE strives.coupon SET times_used = times_used + 1 WHERE id = $1")
                .bind(coupon_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT INTO strives.coupon_redemption (coupon_id, user_id, order_id)
                 VALUES ($1, $2, $3)",
            )
            .bind(coupon_id)
            .bind(request.user_id)
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM strives.cart_item WHERE user_id = $1")
            .bind(request.user_id)
            .execute(&mut *tx)
            .await?;

        let view = attach_items(&mut tx, vec![order]).await?.pop().ok_or_else(|| {
            RepositoryError::DataCorruption("order vanished after insert".to_owned())
        })?;

        tx.commit().await?;
        Ok(view)
    }

    /// The user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderView>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM strives.customer_order o
             WHERE o.user_id = $1
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        attach_items(&mut conn, orders).await
    }

    /// Every order with its customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<AdminOrderView>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, AdminOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS}, u.name AS customer_name, u.email AS customer_email,
                    u.phone AS customer_phone
             FROM strives.customer_order o
             JOIN strives.app_user u ON u.id = o.user_id
             ORDER BY o.created_at DESC, o.id DESC"
        ))
        .fetch_all(&mut *conn)
        .await?;
        Self::admin_views(&mut conn, rows).await
    }

    /// Move an order to `next`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if the order is delivered or
    /// cancelled and `next` is a different status.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<AdminOrderView, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM strives.customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "order is {current} and cannot become {next}"
            )));
        }

        sqlx::query("UPDATE strives.customer_order SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, AdminOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS}, u.name AS customer_name, u.email AS customer_email,
                    u.phone AS customer_phone
             FROM strives.customer_order o
             JOIN strives.app_user u ON u.id = o.user_id
             WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        let view = Self::admin_views(&mut tx, vec![row])
            .await?
            .pop()
            .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(view)
    }

    async fn admin_views(
        conn: &mut PgConnection,
        rows: Vec<AdminOrderRow>,
    ) -> Result<Vec<AdminOrderView>, RepositoryError> {
        let (orders, customers): (Vec<Order>, Vec<OrderCustomer>) =
            rows.into_iter().map(|r| (r.order, r.customer)).unzip();
        let views = attach_items(conn, orders).await?;
        Ok(views
            .into_iter()
            .zip(customers)
            .map(|(order, customer)| AdminOrderView { order, customer })
            .collect())
    }
}
