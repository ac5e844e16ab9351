//! In-process store.
//!
//! A unit of work holds the store's lock for its whole lifetime and writes to
//! a private copy of the tables. Commit swaps the copy in; rollback (or drop)
//! throws it away. Units of work are therefore fully serialised, which is
//! stronger isolation than `PostgreSQL` gives but observably the same for the
//! storefront's operations.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::seq::SliceRandom;
use tokio::sync::{Mutex, OwnedMutexGuard};

use corner_shop_core::{CartId, CartItemId, OrderId, ProductId, UserId, Username};

use super::{GetOrCreate, RepositoryError, Store, UnitOfWork};
use crate::models::{
    Cart, CartItem, CartLine, NewOrder, NewProduct, Order, Product, ProductFilter, ProductOrder,
    User,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i32,
    users: Vec<(User, String)>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    failing_stock_updates: HashSet<ProductId>,
}

impl Tables {
    const fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn active_cart(&self, user_id: UserId) -> Option<&Cart> {
        self.carts
            .iter()
            .find(|c| c.user_id == user_id && c.is_active)
    }

    fn line(&self, item: &CartItem) -> Result<CartLine, RepositoryError> {
        let product = self.product(item.product_id).ok_or_else(|| {
            RepositoryError::DataCorruption(format!(
                "cart item {} references missing product {}",
                item.id, item.product_id
            ))
        })?;
        Ok(CartLine {
            item: item.clone(),
            product: product.clone(),
        })
    }
}

/// Store that keeps every table in memory.
///
/// Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later stock decrement of `product_id` fail with a database
    /// error, as if the connection dropped mid-transaction.
    pub async fn fail_stock_updates_for(&self, product_id: ProductId) {
        self.tables
            .lock()
            .await
            .failing_stock_updates
            .insert(product_id);
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Uow = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork, RepositoryError> {
        let committed = Arc::clone(&self.tables).lock_owned().await;
        let working = committed.clone();
        Ok(MemoryUnitOfWork { committed, working })
    }
}

/// A unit of work over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    committed: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_user(
        &mut self,
        username: &Username,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let tables = &mut self.working;
        if tables.users.iter().any(|(u, _)| &u.username == username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(tables.next_id()),
            username: username.clone(),
            created_at: Utc::now(),
        };
        tables.users.push((user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn user_with_password_hash(
        &mut self,
        username: &Username,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .working
            .users
            .iter()
            .find(|(u, _)| &u.username == username)
            .cloned())
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.working.product(id).cloned())
    }

    async fn products(&mut self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> = self
            .working
            .products
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        match filter.order {
            ProductOrder::Name => {
                products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_i32().cmp(&b.id.as_i32())));
            }
            ProductOrder::Random => products.shuffle(&mut rand::rng()),
        }

        if let Some(limit) = filter.limit {
            products.truncate(limit);
        }

        Ok(products)
    }

    async fn insert_product(&mut self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let tables = &mut self.working;
        let product = Product {
            id: ProductId::new(tables.next_id()),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            created_at: Utc::now(),
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn decrement_stock(
        &mut self,
        id: ProductId,
        quantity: u32,
    ) -> Result<Option<u32>, RepositoryError> {
        let tables = &mut self.working;
        if tables.failing_stock_updates.contains(&id) {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "stock update for product {id} failed"
            ))));
        }

        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if product.stock < quantity {
            return Ok(None);
        }
        product.stock -= quantity;
        Ok(Some(product.stock))
    }

    async fn active_cart(&mut self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.working.active_cart(user_id).cloned())
    }

    // Units of work already run one at a time.
    async fn active_cart_for_update(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.working.active_cart(user_id).cloned())
    }

    async fn get_or_create_active_cart(
        &mut self,
        user_id: UserId,
    ) -> Result<GetOrCreate<Cart>, RepositoryError> {
        let tables = &mut self.working;
        if let Some(cart) = tables.active_cart(user_id) {
            return Ok(GetOrCreate::Found(cart.clone()));
        }

        let cart = Cart {
            id: CartId::new(tables.next_id()),
            user_id,
            is_active: true,
            created_at: Utc::now(),
        };
        tables.carts.push(cart.clone());
        Ok(GetOrCreate::Created(cart))
    }

    async fn retire_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        let cart = self
            .working
            .carts
            .iter_mut()
            .find(|c| c.id == cart_id && c.is_active)
            .ok_or(RepositoryError::NotFound)?;
        cart.is_active = false;
        Ok(())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let tables = &self.working;
        tables
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart_id)
            .map(|item| tables.line(item))
            .collect()
    }

    async fn cart_lines_for_update(
        &mut self,
        cart_id: CartId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        // The whole store is already locked by this unit of work.
        self.cart_lines(cart_id).await
    }

    async fn get_or_create_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<GetOrCreate<CartItem>, RepositoryError> {
        let tables = &mut self.working;
        if let Some(item) = tables
            .cart_items
            .iter()
            .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        {
            return Ok(GetOrCreate::Found(item.clone()));
        }

        let item = CartItem {
            id: CartItemId::new(tables.next_id()),
            cart_id,
            product_id,
            quantity: 1,
        };
        tables.cart_items.push(item.clone());
        Ok(GetOrCreate::Created(item))
    }

    async fn owned_cart_line(
        &mut self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let tables = &self.working;
        let Some(cart) = tables.active_cart(user_id) else {
            return Ok(None);
        };
        tables
            .cart_items
            .iter()
            .find(|i| i.id == item_id && i.cart_id == cart.id)
            .map(|item| tables.line(item))
            .transpose()
    }

    async fn set_cart_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return Err(RepositoryError::Conflict(
                "cart item quantity must be positive".to_owned(),
            ));
        }
        let item = self
            .working
            .cart_items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<(), RepositoryError> {
        let items = &mut self.working.cart_items;
        let before = items.len();
        items.retain(|i| i.id != item_id);
        if items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let tables = &mut self.working;
        if tables.orders.iter().any(|o| o.cart_id == order.cart_id) {
            return Err(RepositoryError::Conflict(
                "order for cart already exists".to_owned(),
            ));
        }

        let order = Order {
            id: OrderId::new(tables.next_id()),
            user_id: order.user_id,
            cart_id: order.cart_id,
            shipping_address: order.shipping_address.clone(),
            status: order.status,
            created_at: Utc::now(),
        };
        tables.orders.push(order.clone());
        Ok(order)
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i32().cmp(&a.id.as_i32()))
        });
        Ok(orders)
    }

    async fn order_for_user(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        Ok(self
            .working
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let Self {
            mut committed,
            working,
        } = self;
        *committed = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
