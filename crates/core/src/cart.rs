//! Cart line merging.
//!
//! A cart holds at most one line per product and size. Adding a product that
//! is already in the cart in the same size sets that line's quantity rather
//! than adding to it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, Size, round_money};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("quantity cannot exceed {max}")]
    QuantityTooLarge { max: u32 },
}

/// One product in one size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: u32,
}

/// What [`Cart::upsert`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    Added(CartLine),
    Updated { line: CartLine, previous: u32 },
}

impl CartChange {
    #[must_use]
    pub const fn line(&self) -> &CartLine {
        match self {
            Self::Added(line) | Self::Updated { line, .. } => line,
        }
    }
}

/// Turn a submitted quantity into a line quantity.
///
/// Missing, zero and negative quantities mean 1.
///
/// # Errors
///
/// Returns [`CartError::QuantityTooLarge`] above [`MAX_LINE_QUANTITY`].
pub fn normalize_quantity(quantity: Option<i64>) -> Result<u32, CartError> {
    match quantity {
        None => Ok(1),
        Some(q) if q < 1 => Ok(1),
        Some(q) => u32::try_from(q)
            .ok()
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or(CartError::QuantityTooLarge {
                max: MAX_LINE_QUANTITY,
            }),
    }
}

/// A user's cart, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Set the quantity of the `product_id`/`size` line, appending it if
    /// absent.
    pub fn upsert(&mut self, product_id: ProductId, size: Size, quantity: u32) -> CartChange {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id && l.size == size)
        {
            let previous = line.quantity;
            line.quantity = quantity;
            return CartChange::Updated {
                line: line.clone(),
                previous,
            };
        }

        let line = CartLine {
            product_id,
            size,
            quantity,
        };
        self.lines.push(line.clone());
        CartChange::Added(line)
    }

    /// Remove every line for `product_id`, or only the line in `size`.
    ///
    /// Returns the number of lines removed.
    pub fn remove(&mut self, product_id: ProductId, size: Option<&Size>) -> usize {
        let before = self.lines.len();
        self.lines
            .retain(|l| !(l.product_id == product_id && size.is_none_or(|s| *s == l.size)));
        before - self.lines.len()
    }

    /// Build a cart from a submitted list, collapsing duplicate
    /// product/size pairs onto the last quantity given.
    #[must_use]
    pub fn replaced_with(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::default();
        for line in lines {
            cart.upsert(line.product_id, line.size, line.quantity);
        }
        cart
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Sum of `unit_price * quantity` over priced lines, rounded to paise.
#[must_use]
pub fn subtotal<'a>(priced: impl IntoIterator<Item = (&'a CartLine, Decimal)>) -> Decimal {
    round_money(
        priced
            .into_iter()
            .map(|(line, unit_price)| unit_price * Decimal::from(line.quantity))
            .sum(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn size(s: &str) -> Size {
        Size::parse(s).unwrap()
    }

    fn line(product: i32, s: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            size: size(s),
            quantity,
        }
    }

    #[test]
    fn test_upsert_appends_new_lines() {
        let mut cart = Cart::default();
        let change = cart.upsert(ProductId::new(1), size("M"), 2);
        assert_eq!(change, CartChange::Added(line(1, "M", 2)));
        cart.upsert(ProductId::new(1), size("L"), 1);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_upsert_sets_quantity_on_match() {
        let mut cart = Cart::from_lines(vec![line(1, "M", 2), line(2, "S", 1)]);
        let change = cart.upsert(ProductId::new(1), size("m"), 5);
        assert_eq!(
            change,
            CartChange::Updated {
                line: line(1, "M", 5),
                previous: 2,
            }
        );
        assert_eq!(cart.lines(), &[line(1, "M", 5), line(2, "S", 1)]);
    }

    #[test]
    fn test_remove_all_sizes_or_one() {
        let mut cart = Cart::from_lines(vec![line(1, "M", 1), line(1, "L", 1), line(2, "M", 1)]);
        assert_eq!(cart.remove(ProductId::new(1), Some(&size("L"))), 1);
        assert_eq!(cart.lines(), &[line(1, "M", 1), line(2, "M", 1)]);

        cart.upsert(ProductId::new(1), size("XL"), 1);
        assert_eq!(cart.remove(ProductId::new(1), None), 2);
        assert_eq!(cart.lines(), &[line(2, "M", 1)]);

        assert_eq!(cart.remove(ProductId::new(9), None), 0);
    }

    #[test]
    fn test_replace_collapses_duplicates() {
        let cart = Cart::replaced_with(vec![line(1, "M", 1), line(2, "S", 3), line(1, "M", 4)]);
        assert_eq!(cart.lines(), &[line(1, "M", 4), line(2, "S", 3)]);
    }

    #[test]
    fn test_normalize_quantity() {
        assert_eq!(normalize_quantity(None).unwrap(), 1);
        assert_eq!(normalize_quantity(Some(0)).unwrap(), 1);
        assert_eq!(normalize_quantity(Some(-4)).unwrap(), 1);
        assert_eq!(normalize_quantity(Some(7)).unwrap(), 7);
        assert_eq!(
            normalize_quantity(Some(100)),
            Err(CartError::QuantityTooLarge { max: 99 })
        );
    }

    #[test]
    fn test_subtotal() {
        let a = line(1, "M", 2);
        let b = line(2, "S", 1);
        let total = subtotal([(&a, "499.50".parse().unwrap()), (&b, "1000".parse().unwrap())]);
        assert_eq!(total, "1999".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::from_lines(vec![line(1, "M", 1)]);
        cart.clear();
        assert!(cart.is_empty());
    }
}
