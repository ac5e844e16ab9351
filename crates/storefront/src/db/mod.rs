//! Database operations for the storefront.
//!
//! # Database: `corner_shop`
//!
//! ## Tables (schema `shop`)
//!
//! - `user` - Storefront accounts (username + Argon2id hash)
//! - `product` - Catalog with on-hand `stock` (`CHECK (stock >= 0)`)
//! - `cart` - One active cart per user (partial unique index), retired at checkout
//! - `cart_item` - Lines in a cart (`CHECK (quantity > 0)`)
//! - `order` - Orders pointing at their retired cart
//!
//! Sessions live in the `tower_sessions` schema managed by
//! `tower-sessions-sqlx-store`.
//!
//! # Units of work
//!
//! Every repository operation runs inside a [`UnitOfWork`] obtained from a
//! [`Store`]. [`atomically`] scopes one unit of work around a callback: it
//! commits when the callback returns `Ok` and rolls back on `Err`. A unit of
//! work that is dropped without being committed is rolled back as well.
//!
//! Two stores implement the traits: [`PgStore`] for `PostgreSQL` and
//! [`MemoryStore`], an in-process store with the same all-or-nothing semantics.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p corner-shop-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod orders;
pub mod postgres;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use corner_shop_core::{CartId, CartItemId, OrderId, ProductId, UserId, Username};

use crate::models::{
    Cart, CartItem, CartLine, NewOrder, NewProduct, Order, Product, ProductFilter, User,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Result of a get-or-create lookup, tagged with which branch was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOrCreate<T> {
    /// The record already existed.
    Found(T),
    /// The record was inserted by this call.
    Created(T),
}

impl<T> GetOrCreate<T> {
    /// Whether this call inserted the record.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Borrow the record.
    #[must_use]
    pub const fn get(&self) -> &T {
        match self {
            Self::Found(value) | Self::Created(value) => value,
        }
    }

    /// Take the record.
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Found(value) | Self::Created(value) => value,
        }
    }
}

/// Source of units of work.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Transaction handle type.
    type Uow: UnitOfWork;

    /// Start a unit of work.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a transaction cannot be started.
    async fn begin(&self) -> Result<Self::Uow, RepositoryError>;
}

/// Repository operations scoped to one storage transaction.
///
/// Ownership is enforced by the queries themselves: anything addressed by a
/// cart item or order ID is looked up together with the owning user.
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Insert a user with a password hash.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn insert_user(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Look up a user and their password hash by username.
    async fn user_with_password_hash(
        &mut self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Products
    // -------------------------------------------------------------------------

    /// Get a product by ID.
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// List products matching `filter`.
    async fn products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a catalog product.
    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Take `quantity` units out of stock.
    ///
    /// Single-row guarded update: returns the remaining stock, or `None` when
    /// fewer than `quantity` units are on hand (stock is left untouched).
    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Carts
    // -------------------------------------------------------------------------

    /// The user's active cart, if one exists.
    async fn active_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// The user's active cart, locked until the unit of work ends.
    async fn active_cart_for_update(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Cart>, RepositoryError>;

    /// The user's active cart, created if absent.
    async fn get_or_create_active_cart(
        &mut self,
        user_id: UserId,
    ) -> Result<GetOrCreate<Cart>, RepositoryError>;

    /// Clear the active flag on a cart.
    ///
    /// Returns `RepositoryError::NotFound` if the cart is missing or already
    /// retired.
    async fn retire_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError>;

    /// Lines of a cart (active or retired), oldest first.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Lines of a cart with their product rows locked until the unit of work
    /// ends.
    async fn cart_lines_for_update(
        &mut self,
        cart_id: CartId,
    ) -> Result<Vec<CartLine>, RepositoryError>;

    /// The cart's line for `product_id`, inserted with quantity 1 if absent.
    async fn get_or_create_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<GetOrCreate<CartItem>, RepositoryError>;

    /// A line of the user's *active* cart. Items in other users' carts or in
    /// retired carts are reported as absent.
    async fn owned_cart_line(
        &mut self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Overwrite a line's quantity (must be positive).
    async fn set_cart_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError>;

    /// Delete a line.
    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// Insert an order.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// The user's orders, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// One of the user's orders.
    async fn order_for_user(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Transaction control
    // -------------------------------------------------------------------------

    /// Make every write in this unit of work visible.
    async fn commit(self) -> Result<(), RepositoryError>;

    /// Discard every write in this unit of work.
    async fn rollback(self) -> Result<(), RepositoryError>;
}

/// Run `work` inside one unit of work.
///
/// Commits when `work` returns `Ok`. On `Err` the unit of work is rolled back
/// and the error returned unchanged, so no write made by `work` survives.
///
/// ```rust,ignore
/// let order = db::atomically(&store, move |uow| {
///     Box::pin(place_order(uow, user_id, cart_id, address))
/// })
/// .await?;
/// ```
///
/// # Errors
///
/// Returns the callback's error, or a `RepositoryError` (converted into `E`)
/// if the unit of work cannot be started or committed.
pub async fn atomically<S, T, E, F>(store: &S, work: F) -> Result<T, E>
where
    S: Store,
    T: Send,
    E: From<RepositoryError> + Send,
    F: for<'t> FnOnce(&'t mut S::Uow) -> BoxFuture<'t, Result<T, E>> + Send,
{
    let mut uow = store.begin().await?;

    match work(&mut uow).await {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!(error = %rollback_err, "Failed to roll back unit of work");
            }
            Err(err)
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply the storefront schema migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Map a unique-constraint violation to `RepositoryError::Conflict`.
fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

/// Convert a non-negative `INTEGER` column to `u32`.
fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a count to an `INTEGER` bind parameter.
fn to_db_int(value: u32, column: &str) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::Conflict(format!("{column} out of range: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_accessors() {
        let found = GetOrCreate::Found(3);
        let created = GetOrCreate::Created(4);

        assert!(!found.was_created());
        assert!(created.was_created());
        assert_eq!(*found.get(), 3);
        assert_eq!(created.into_inner(), 4);
    }

    #[test]
    fn test_non_negative_rejects_negative_values() {
        assert_eq!(non_negative(5, "stock").ok(), Some(5));
        assert!(matches!(
            non_negative(-1, "stock"),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_to_db_int_rejects_overflow() {
        assert_eq!(to_db_int(7, "quantity").ok(), Some(7));
        assert!(to_db_int(u32::MAX, "quantity").is_err());
    }
}
