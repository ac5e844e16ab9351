//! `PostgreSQL`-backed store.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use corner_shop_core::{CartId, CartItemId, OrderId, ProductId, UserId, Username};

use super::{GetOrCreate, RepositoryError, Store, UnitOfWork, carts, orders, products, users};
use crate::models::{
    Cart, CartItem, CartLine, NewOrder, NewProduct, Order, Product, ProductFilter, User,
};

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// A database transaction. Dropping it without committing rolls back.
#[derive(Debug)]
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_user(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        users::insert(&mut self.tx, username, password_hash).await
    }

    async fn user_with_password_hash(
        &mut self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        users::with_password_hash(&mut self.tx, username).await
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        products::get(&mut self.tx, id).await
    }

    async fn products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        products::list(&mut self.tx, filter).await
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        products::insert(&mut self.tx, product).await
    }

    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        products::decrement_stock(&mut self.tx, id, quantity).await
    }

    async fn active_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        carts::active(&mut self.tx, user_id).await
    }

    async fn active_cart_for_update(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Cart>, RepositoryError> {
        carts::active_for_update(&mut self.tx, user_id).await
    }

    async fn get_or_create_active_cart(
        &mut self,
        user_id: UserId,
    ) -> Result<GetOrCreate<Cart>, RepositoryError> {
        carts::get_or_create_active(&mut self.tx, user_id).await
    }

    async fn retire_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        carts::retire(&mut self.tx, cart_id).await
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        carts::lines(&mut self.tx, cart_id, false).await
    }

    async fn cart_lines_for_update(
        &mut self,
        cart_id: CartId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        carts::lines(&mut self.tx, cart_id, true).await
    }

    async fn get_or_create_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<GetOrCreate<CartItem>, RepositoryError> {
        carts::get_or_create_item(&mut self.tx, cart_id, product_id).await
    }

    async fn owned_cart_line(
        &mut self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        carts::owned_line(&mut self.tx, user_id, item_id).await
    }

    async fn set_cart_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        carts::set_quantity(&mut self.tx, item_id, quantity).await
    }

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<(), RepositoryError> {
        carts::delete_item(&mut self.tx, item_id).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        orders::insert(&mut self.tx, order).await
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        orders::list_for_user(&mut self.tx, user_id).await
    }

    async fn order_for_user(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        orders::get_for_user(&mut self.tx, user_id, order_id).await
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
