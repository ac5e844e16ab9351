//! Order queries for `PostgreSQL`.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use corner_shop_core::{CartId, OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{NewOrder, Order};

const ORDER_COLUMNS: &str = "id, user_id, cart_id, shipping_address, status, created_at";

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    cart_id: i32,
    shipping_address: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            cart_id: CartId::new(row.cart_id),
            shipping_address: row.shipping_address,
            status,
            created_at: row.created_at,
        })
    }
}

/// Insert an order.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the cart already has an order.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO shop.\"order\" (user_id, cart_id, shipping_address, status) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.user_id)
    .bind(order.cart_id)
    .bind(&order.shipping_address)
    .bind(order.status.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| super::conflict_on_unique(e, "order for cart"))?;

    Order::try_from(row)
}

/// List a user's orders, newest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
pub async fn list_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<Order>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.\"order\" \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Order::try_from).collect()
}

/// Get one of a user's orders.
///
/// Orders belonging to other users are reported as absent.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if the stored status is unknown.
pub async fn get_for_user(
    conn: &mut PgConnection,
    user_id: UserId,
    order_id: OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.\"order\" WHERE id = $1 AND user_id = $2"
    ))
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Order::try_from).transpose()
}
