//! Order domain types.

use chrono::{DateTime, Utc};

use corner_shop_core::{CartId, OrderId, OrderStatus, UserId};

/// An order placed at checkout.
///
/// Immutable once created. The line items live on the retired cart the order
/// points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub shipping_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub cart_id: CartId,
    pub shipping_address: String,
    pub status: OrderStatus,
}
