//! Favourites as an ordered set of products.

use crate::types::ProductId;

/// A user's favourite products, oldest first, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wishlist {
    products: Vec<ProductId>,
}

impl Wishlist {
    /// Build from stored ids, dropping any repeats.
    #[must_use]
    pub fn from_products(products: impl IntoIterator<Item = ProductId>) -> Self {
        let mut wishlist = Self::default();
        for id in products {
            wishlist.add(id);
        }
        wishlist
    }

    #[must_use]
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.products.contains(&product_id)
    }

    /// Add `product_id`. Returns `false` if it was already present.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.contains(product_id) {
            return false;
        }
        self.products.push(product_id);
        true
    }

    /// Remove `product_id`. Returns `false` if it was not present.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|id| *id != product_id);
        self.products.len() != before
    }

    pub fn clear(&mut self) {
        self.products.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut list = Wishlist::default();
        assert!(list.add(ProductId::new(3)));
        assert!(!list.add(ProductId::new(3)));
        assert!(list.add(ProductId::new(1)));
        assert_eq!(list.products(), &[ProductId::new(3), ProductId::new(1)]);
    }

    #[test]
    fn test_from_products_dedupes() {
        let list = Wishlist::from_products([1, 2, 1, 3].map(ProductId::new));
        assert_eq!(list.products().len(), 3);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut list = Wishlist::from_products([1, 2].map(ProductId::new));
        assert!(list.remove(ProductId::new(1)));
        assert!(!list.remove(ProductId::new(1)));
        list.clear();
        assert!(list.products().is_empty());
    }
}
