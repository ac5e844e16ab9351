//! Cart and cart item queries for `PostgreSQL`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use corner_shop_core::{CartId, CartItemId, ProductId, UserId};

use super::{GetOrCreate, RepositoryError, non_negative, to_db_int};
use crate::models::{Cart, CartItem, CartLine, Product};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for cart queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<CartRow> for Cart {
    fn from(row: CartRow) -> Self {
        Self {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Internal row type for cart item queries.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    cart_id: i32,
    product_id: i32,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = non_negative(row.quantity, "quantity")?;
        if quantity == 0 {
            return Err(RepositoryError::DataCorruption(format!(
                "cart item {} has zero quantity",
                row.id
            )));
        }

        Ok(Self {
            id: CartItemId::new(row.id),
            cart_id: CartId::new(row.cart_id),
            product_id: ProductId::new(row.product_id),
            quantity,
        })
    }
}

/// Internal row type for cart items joined with their product.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    item_id: i32,
    cart_id: i32,
    quantity: i32,
    product_id: i32,
    product_name: String,
    product_description: String,
    product_price: Decimal,
    product_stock: i32,
    product_created_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let item = CartItem::try_from(CartItemRow {
            id: row.item_id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: row.quantity,
        })?;

        let product = Product {
            id: ProductId::new(row.product_id),
            name: row.product_name,
            description: row.product_description,
            price: row.product_price,
            stock: non_negative(row.product_stock, "stock")?,
            created_at: row.product_created_at,
        };

        Ok(Self { item, product })
    }
}

const CART_COLUMNS: &str = "id, user_id, is_active, created_at";
const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity";

const CART_LINE_SELECT: &str = r"
    SELECT ci.id AS item_id, ci.cart_id, ci.quantity,
           p.id AS product_id, p.name AS product_name,
           p.description AS product_description, p.price AS product_price,
           p.stock AS product_stock, p.created_at AS product_created_at
    FROM shop.cart_item ci
    JOIN shop.product p ON p.id = ci.product_id
";

// =============================================================================
// Carts
// =============================================================================

/// Get the user's active cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn active(conn: &mut PgConnection, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
    let row = sqlx::query_as::<_, CartRow>(&format!(
        "SELECT {CART_COLUMNS} FROM shop.cart WHERE user_id = $1 AND is_active"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Cart::from))
}

/// Get the user's active cart and lock its row until the transaction ends.
///
/// A concurrent transaction that retires the cart first makes this return
/// `None` once its lock is released.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn active_for_update(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<Cart>, RepositoryError> {
    let row = sqlx::query_as::<_, CartRow>(&format!(
        "SELECT {CART_COLUMNS} FROM shop.cart WHERE user_id = $1 AND is_active FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Cart::from))
}

/// Get the user's active cart, creating it if absent.
///
/// The insert is `ON CONFLICT DO NOTHING` against the one-active-cart-per-user
/// index, so a concurrent request that created the cart first wins and its
/// cart is returned as `Found`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn get_or_create_active(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<GetOrCreate<Cart>, RepositoryError> {
    if let Some(cart) = active(conn, user_id).await? {
        return Ok(GetOrCreate::Found(cart));
    }

    let inserted = sqlx::query_as::<_, CartRow>(&format!(
        "INSERT INTO shop.cart (user_id) VALUES ($1) \
         ON CONFLICT (user_id) WHERE is_active DO NOTHING \
         RETURNING {CART_COLUMNS}"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = inserted {
        return Ok(GetOrCreate::Created(Cart::from(row)));
    }

    active(conn, user_id)
        .await?
        .map(GetOrCreate::Found)
        .ok_or(RepositoryError::NotFound)
}

/// Retire an active cart.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the cart is missing or already retired.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn retire(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE shop.cart
        SET is_active = FALSE
        WHERE id = $1 AND is_active
        ",
    )
    .bind(cart_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

// =============================================================================
// Cart Lines
// =============================================================================

/// Get the lines of a cart.
///
/// With `lock` set, the product rows are locked `FOR UPDATE` so stock cannot
/// change underneath the caller until its transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if a row violates a domain invariant.
pub async fn lines(
    conn: &mut PgConnection,
    cart_id: CartId,
    lock: bool,
) -> Result<Vec<CartLine>, RepositoryError> {
    let lock_clause = if lock { " FOR UPDATE OF p" } else { "" };
    let rows = sqlx::query_as::<_, CartLineRow>(&format!(
        "{CART_LINE_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id{lock_clause}"
    ))
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(CartLine::try_from).collect()
}

/// Get a line of the user's active cart.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn owned_line(
    conn: &mut PgConnection,
    user_id: UserId,
    item_id: CartItemId,
) -> Result<Option<CartLine>, RepositoryError> {
    let row = sqlx::query_as::<_, CartLineRow>(&format!(
        "{CART_LINE_SELECT} \
         JOIN shop.cart c ON c.id = ci.cart_id \
         WHERE ci.id = $1 AND c.user_id = $2 AND c.is_active"
    ))
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(CartLine::try_from).transpose()
}

// =============================================================================
// Cart Items
// =============================================================================

/// Get the cart's item for a product, inserting it with quantity 1 if absent.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn get_or_create_item(
    conn: &mut PgConnection,
    cart_id: CartId,
    product_id: ProductId,
) -> Result<GetOrCreate<CartItem>, RepositoryError> {
    let select = format!(
        "SELECT {CART_ITEM_COLUMNS} FROM shop.cart_item WHERE cart_id = $1 AND product_id = $2"
    );

    let existing = sqlx::query_as::<_, CartItemRow>(&select)
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some(row) = existing {
        return Ok(GetOrCreate::Found(CartItem::try_from(row)?));
    }

    let inserted = sqlx::query_as::<_, CartItemRow>(&format!(
        "INSERT INTO shop.cart_item (cart_id, product_id, quantity) VALUES ($1, $2, 1) \
         ON CONFLICT (cart_id, product_id) DO NOTHING \
         RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(row) = inserted {
        return Ok(GetOrCreate::Created(CartItem::try_from(row)?));
    }

    let row = sqlx::query_as::<_, CartItemRow>(&select)
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(GetOrCreate::Found(CartItem::try_from(row)?))
}

/// Set a cart item's quantity.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the item doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn set_quantity(
    conn: &mut PgConnection,
    item_id: CartItemId,
    quantity: u32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("UPDATE shop.cart_item SET quantity = $2 WHERE id = $1")
        .bind(item_id)
        .bind(to_db_int(quantity, "quantity")?)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Delete a cart item.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the item doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn delete_item(conn: &mut PgConnection, item_id: CartItemId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM shop.cart_item WHERE id = $1")
        .bind(item_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}
