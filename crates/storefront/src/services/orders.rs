//! Order history.

use rust_decimal::Decimal;
use tracing::instrument;

use corner_shop_core::{OrderId, UserId};

use super::{OrNotFound, ShopError};
use crate::db::{self, Store, UnitOfWork};
use crate::models::cart::cart_total;
use crate::models::{CartLine, CurrentUser, Order};

/// An order with the lines of its retired cart.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub lines: Vec<CartLine>,
}

impl OrderDetail {
    #[must_use]
    pub fn total(&self) -> Decimal {
        cart_total(&self.lines)
    }
}

/// The caller's orders, newest first.
///
/// # Errors
///
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn list<S: Store>(store: &S, user: &CurrentUser) -> Result<Vec<Order>, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| Box::pin(orders_of(uow, user_id))).await
}

/// One of the caller's orders.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the order doesn't exist or belongs to
/// another user.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn detail<S: Store>(
    store: &S,
    user: &CurrentUser,
    order_id: OrderId,
) -> Result<OrderDetail, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| {
        Box::pin(order_with_lines(uow, user_id, order_id))
    })
    .await
}

async fn orders_of<U: UnitOfWork>(uow: &mut U, user_id: UserId) -> Result<Vec<Order>, ShopError> {
    Ok(uow.orders_for_user(user_id).await?)
}

async fn order_with_lines<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    order_id: OrderId,
) -> Result<OrderDetail, ShopError> {
    let order = uow
        .order_for_user(user_id, order_id)
        .await?
        .or_not_found("order")?;
    let lines = uow.cart_lines(order.cart_id).await?;
    Ok(OrderDetail { order, lines })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use corner_shop_core::Username;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;
    use crate::services::{cart, checkout};

    fn shopper(id: i32) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: Username::parse(&format!("shopper{id}")).unwrap(),
        }
    }

    async fn place(store: &MemoryStore, user: &CurrentUser, name: &str) -> Order {
        let mut uow = store.begin().await.unwrap();
        let product = uow
            .insert_product(&NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Decimal::new(250, 2),
                stock: 10,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();

        cart::add(store, user, product.id).await.unwrap();
        cart::add(store, user, product.id).await.unwrap();
        let cart_id = cart::view(store, user).await.unwrap().cart.id;
        checkout::checkout(store, user, cart_id, "1 Main St").await.unwrap()
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let first = place(&store, &user, "Mug").await;
        let second = place(&store, &user, "Bowl").await;

        let ids: Vec<OrderId> = list(&store, &user)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, [second.id, first.id]);
    }

    #[tokio::test]
    async fn test_detail_includes_retired_cart_lines() {
        let store = MemoryStore::new();
        let user = shopper(1);
        let order = place(&store, &user, "Mug").await;

        let detail = detail(&store, &user, order.id).await.unwrap();
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].item.quantity, 2);
        assert_eq!(detail.total(), Decimal::new(500, 2));
    }

    #[tokio::test]
    async fn test_other_users_order_is_not_found() {
        let store = MemoryStore::new();
        let owner = shopper(1);
        let order = place(&store, &owner, "Mug").await;

        assert!(matches!(
            detail(&store, &shopper(2), order.id).await,
            Err(ShopError::NotFound("order"))
        ));
        assert!(list(&store, &shopper(2)).await.unwrap().is_empty());
    }
}
