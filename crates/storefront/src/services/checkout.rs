//! Checkout: turn the active cart into an order.
//!
//! Checks run in a fixed order and each failure aborts before any write:
//!
//! 1. the shipping address is not blank
//! 2. the cart is the caller's active cart
//! 3. the cart has at least one line
//! 4. every line's quantity is covered by current stock
//!
//! The writes (decrement stock per line, insert the order, retire the cart)
//! share one unit of work with the checks. Product rows are locked while the
//! lines are read and every decrement is guarded, so a sale that races this
//! one is reported as `InsufficientStock` and nothing is written.

use tracing::{info, instrument, warn};

use corner_shop_core::{CartId, OrderStatus, UserId};

use super::{OrNotFound, ShopError};
use crate::db::{self, Store, UnitOfWork};
use crate::models::cart::cart_total;
use crate::models::{CartLine, CurrentUser, NewOrder, Order};

/// The active cart as shown on the checkout form.
#[derive(Debug, Clone)]
pub struct CheckoutSummary {
    pub cart_id: CartId,
    pub lines: Vec<CartLine>,
}

impl CheckoutSummary {
    #[must_use]
    pub fn total(&self) -> rust_decimal::Decimal {
        cart_total(&self.lines)
    }
}

/// Load the caller's active cart for the checkout form.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the caller has no active cart.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn summary<S: Store>(
    store: &S,
    user: &CurrentUser,
) -> Result<CheckoutSummary, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| Box::pin(load_summary(uow, user_id))).await
}

/// Place an order for the caller's active cart.
///
/// # Errors
///
/// Returns `ShopError::Validation` if the address is blank.
/// Returns `ShopError::NotFound` if `cart_id` is not the caller's active cart.
/// Returns `ShopError::EmptyCart` if the cart has no lines.
/// Returns `ShopError::InsufficientStock` if a line exceeds current stock.
/// Returns `ShopError::Repository` if the store fails; nothing is written.
#[instrument(skip(store, user, shipping_address), fields(user_id = %user.id))]
pub async fn checkout<S: Store>(
    store: &S,
    user: &CurrentUser,
    cart_id: CartId,
    shipping_address: &str,
) -> Result<Order, ShopError> {
    let shipping_address = shipping_address.trim();
    if shipping_address.is_empty() {
        return Err(ShopError::Validation(
            "Please provide a shipping address".to_owned(),
        ));
    }

    let user_id = user.id;
    let shipping_address = shipping_address.to_owned();
    let order = db::atomically(store, move |uow| {
        Box::pin(place_order(uow, user_id, cart_id, shipping_address))
    })
    .await?;

    info!(order_id = %order.id, cart_id = %order.cart_id, "Order placed");
    Ok(order)
}

async fn load_summary<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
) -> Result<CheckoutSummary, ShopError> {
    let cart = uow.active_cart(user_id).await?.or_not_found("cart")?;
    let lines = uow.cart_lines(cart.id).await?;
    Ok(CheckoutSummary {
        cart_id: cart.id,
        lines,
    })
}

async fn place_order<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    cart_id: CartId,
    shipping_address: String,
) -> Result<Order, ShopError> {
    let cart = uow
        .active_cart_for_update(user_id)
        .await?
        .filter(|cart| cart.id == cart_id)
        .or_not_found("cart")?;

    let lines = uow.cart_lines_for_update(cart.id).await?;
    if lines.is_empty() {
        return Err(ShopError::EmptyCart);
    }

    if let Some(short) = lines.iter().find(|line| !line.is_supplied()) {
        return Err(insufficient(short, short.product.stock));
    }

    for line in &lines {
        let remaining = uow
            .decrement_stock(line.product.id, line.item.quantity)
            .await?;
        if remaining.is_none() {
            let available = uow
                .product(line.product.id)
                .await?
                .map_or(0, |product| product.stock);
            warn!(product_id = %line.product.id, available, "Stock changed during checkout");
            return Err(insufficient(line, available));
        }
    }

    let order = uow
        .insert_order(&NewOrder {
            user_id,
            cart_id: cart.id,
            shipping_address,
            status: OrderStatus::Pending,
        })
        .await?;

    uow.retire_cart(cart.id).await?;

    Ok(order)
}

fn insufficient(line: &CartLine, available: u32) -> ShopError {
    ShopError::InsufficientStock {
        product_id: line.product.id,
        product_name: line.product.name.clone(),
        available,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use corner_shop_core::{ProductId, Username};

    use super::*;
    use crate::db::{MemoryStore, RepositoryError};
    use crate::models::NewProduct;
    use crate::services::cart;

    fn shopper(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: Username::parse(&format!("shopper{id}")).unwrap(),
        }
    }

    async fn product(store: &MemoryStore, name: &str, stock: u32) -> ProductId {
        let mut uow = store.begin().await.unwrap();
        let product = uow
            .insert_product(&NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Decimal::new(1000, 2),
                stock,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        product.id
    }

    /// Put `quantity` units of `product_id` in the user's cart, bypassing the
    /// stock guards so checkout itself can be exercised.
    async fn fill(store: &MemoryStore, user: &CurrentUser, product_id: ProductId, quantity: u32) -> CartId {
        let mut uow = store.begin().await.unwrap();
        let cart = uow
            .get_or_create_active_cart(user.id)
            .await
            .unwrap()
            .into_inner();
        let item = uow
            .get_or_create_cart_item(cart.id, product_id)
            .await
            .unwrap()
            .into_inner();
        uow.set_cart_item_quantity(item.id, quantity).await.unwrap();
        uow.commit().await.unwrap();
        cart.id
    }

    async fn stock_of(store: &MemoryStore, id: ProductId) -> u32 {
        let mut uow = store.begin().await.unwrap();
        uow.product(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_successful_checkout() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let a = product(&store, "A", 5).await;
        let cart_id = fill(&store, &user, a, 3).await;

        let order = checkout(&store, &user, cart_id, "  1 Main St  ").await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.cart_id, cart_id);
        assert_eq!(order.shipping_address, "1 Main St");
        assert_eq!(stock_of(&store, a).await, 2);

        let fresh = cart::view(&store, &user).await.unwrap();
        assert_ne!(fresh.cart.id, cart_id);
        assert!(fresh.is_empty());

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.cart_lines(cart_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_everything_untouched() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let a = product(&store, "A", 5).await;
        let b = product(&store, "B", 1).await;
        fill(&store, &user, a, 3).await;
        let cart_id = fill(&store, &user, b, 2).await;

        let err = checkout(&store, &user, cart_id, "1 Main St").await.unwrap_err();
        match err {
            ShopError::InsufficientStock {
                product_id,
                available,
                ..
            } => {
                assert_eq!(product_id, b);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(stock_of(&store, a).await, 5);
        assert_eq!(stock_of(&store, b).await, 1);
        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.active_cart(user.id).await.unwrap().unwrap().id, cart_id);
        assert!(uow.orders_for_user(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_address_is_rejected_first() {
        let store = MemoryStore::new();
        let user = shopper(1);

        let err = checkout(&store, &user, CartId::new(1), "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Please provide a shipping address");
    }

    #[tokio::test]
    async fn test_empty_cart() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let cart_id = cart::view(&store, &user).await.unwrap().cart.id;

        assert!(matches!(
            checkout(&store, &user, cart_id, "1 Main St").await,
            Err(ShopError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_other_users_cart_is_not_found() {
        let store = MemoryStore::new();
        let owner = shopper(1);
        let thief = shopper(2);
        let a = product(&store, "A", 5).await;
        let cart_id = fill(&store, &owner, a, 1).await;
        cart::view(&store, &thief).await.unwrap();

        assert!(matches!(
            checkout(&store, &thief, cart_id, "1 Main St").await,
            Err(ShopError::NotFound("cart"))
        ));
        assert_eq!(stock_of(&store, a).await, 5);
    }

    #[tokio::test]
    async fn test_retired_cart_cannot_be_checked_out_twice() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let a = product(&store, "A", 5).await;
        let cart_id = fill(&store, &user, a, 1).await;

        checkout(&store, &user, cart_id, "1 Main St").await.unwrap();
        assert!(matches!(
            checkout(&store, &user, cart_id, "1 Main St").await,
            Err(ShopError::NotFound("cart"))
        ));
        assert_eq!(stock_of(&store, a).await, 4);
    }

    #[tokio::test]
    async fn test_storage_failure_mid_checkout_rolls_back() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let a = product(&store, "A", 5).await;
        let b = product(&store, "B", 5).await;
        fill(&store, &user, a, 2).await;
        let cart_id = fill(&store, &user, b, 2).await;
        store.fail_stock_updates_for(b).await;

        let err = checkout(&store, &user, cart_id, "1 Main St").await.unwrap_err();
        assert!(matches!(
            err,
            ShopError::Repository(RepositoryError::Database(_))
        ));

        assert_eq!(stock_of(&store, a).await, 5);
        let mut uow = store.begin().await.unwrap();
        assert!(uow.active_cart(user.id).await.unwrap().is_some());
        assert!(uow.orders_for_user(user.id).await.unwrap().is_empty());
    }
}
