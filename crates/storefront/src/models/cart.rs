//! Cart domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use corner_shop_core::{CartId, CartItemId, ProductId, UserId};

use super::Product;

/// A user's cart.
///
/// A user has at most one active cart. Checkout retires it (clears
/// `is_active`) and the order keeps pointing at it, so retired carts are never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A product and quantity held in a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Always positive.
    pub quantity: u32,
}

/// A cart item joined with its product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.item.quantity)
    }

    /// Whether the product currently has enough stock for this line.
    #[must_use]
    pub const fn is_supplied(&self) -> bool {
        self.product.can_supply(self.item.quantity)
    }
}

/// Sum of all line totals.
#[must_use]
pub fn cart_total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

/// Total number of units across all lines.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u32 {
    lines.iter().map(|line| line.item.quantity).sum()
}
