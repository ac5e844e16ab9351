//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use corner_shop_core::ProductId;

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price in the store currency.
    pub price: Decimal,
    /// Units on hand. Only checkout decrements it.
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit is on hand.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether `quantity` units can be supplied from current stock.
    #[must_use]
    pub const fn can_supply(&self, quantity: u32) -> bool {
        quantity <= self.stock
    }
}

/// Fields for inserting a product (catalog seeding).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub stock: u32,
}

/// Ordering applied to a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrder {
    #[default]
    Name,
    Random,
}

/// Predicate for product listings.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the name.
    pub name_contains: Option<String>,
    /// Only products with stock > 0.
    pub in_stock_only: bool,
    pub order: ProductOrder,
    pub limit: Option<usize>,
}

impl ProductFilter {
    /// Every product, ordered by name.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Products whose name contains `term`, ignoring case. A blank term
    /// matches everything.
    #[must_use]
    pub fn search(term: &str) -> Self {
        let term = term.trim();
        Self {
            name_contains: (!term.is_empty()).then(|| term.to_owned()),
            ..Self::default()
        }
    }

    /// Up to `count` random in-stock products.
    #[must_use]
    pub fn featured(count: usize) -> Self {
        Self {
            name_contains: None,
            in_stock_only: true,
            order: ProductOrder::Random,
            limit: Some(count),
        }
    }

    /// Whether `product` satisfies the predicate (ordering and limit aside).
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.in_stock() {
            return false;
        }
        self.name_contains.as_ref().is_none_or(|term| {
            product
                .name
                .to_lowercase()
                .contains(&term.to_lowercase())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, stock: u32) -> Product {
        Product {
            id: ProductId::new(1),
            name: name.to_string(),
            description: String::new(),
            price: Decimal::ONE,
            stock,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let filter = ProductFilter::search("MUG");
        assert!(filter.matches(&product("Coffee mug", 0)));
        assert!(!filter.matches(&product("Teapot", 3)));
    }

    #[test]
    fn test_blank_search_matches_everything() {
        let filter = ProductFilter::search("   ");
        assert!(filter.name_contains.is_none());
        assert!(filter.matches(&product("Anything", 0)));
    }

    #[test]
    fn test_featured_excludes_out_of_stock() {
        let filter = ProductFilter::featured(4);
        assert!(!filter.matches(&product("Sold out", 0)));
        assert!(filter.matches(&product("Available", 1)));
        assert_eq!(filter.limit, Some(4));
        assert_eq!(filter.order, ProductOrder::Random);
    }

    #[test]
    fn test_can_supply() {
        let p = product("Lamp", 2);
        assert!(p.can_supply(2));
        assert!(!p.can_supply(3));
    }
}
