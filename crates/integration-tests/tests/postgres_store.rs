//! The same checkout guarantees against `PostgreSQL`.
//!
//! These tests require `TEST_DATABASE_URL` to point at a scratch database;
//! without it they return early. Migrations are applied on first use and
//! every test works with uniquely named users and products.

#![allow(clippy::unwrap_used, clippy::print_stderr)]

use secrecy::SecretString;
use uuid::Uuid;

use corner_shop_integration_tests::{add_product, add_user, put_in_cart, stock_of};
use corner_shop_storefront::db::{self, PgStore};
use corner_shop_storefront::services::{ShopError, cart, checkout, orders};

async fn store() -> Option<PgStore> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    Some(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn checkout_commits_every_write() {
    let Some(store) = store().await else { return };
    let buyer = add_user(&store, &unique("buyer")).await;
    let mug = add_product(&store, &unique("mug"), 1200, 5).await;
    put_in_cart(&store, &buyer, mug.id, 3).await;

    let summary = checkout::summary(&store, &buyer).await.unwrap();
    let order = checkout::checkout(&store, &buyer, summary.cart_id, "1 High St")
        .await
        .unwrap();

    assert_eq!(stock_of(&store, mug.id).await, 2);
    let fresh = cart::view(&store, &buyer).await.unwrap();
    assert_ne!(fresh.cart.id, summary.cart_id);
    assert!(fresh.is_empty());

    let detail = orders::detail(&store, &buyer, order.id).await.unwrap();
    assert_eq!(detail.lines.len(), 1);
}

#[tokio::test]
async fn short_stock_rolls_back() {
    let Some(store) = store().await else { return };
    let buyer = add_user(&store, &unique("buyer")).await;
    let mug = add_product(&store, &unique("mug"), 1200, 5).await;
    let pot = add_product(&store, &unique("pot"), 4600, 1).await;
    put_in_cart(&store, &buyer, mug.id, 3).await;
    put_in_cart(&store, &buyer, pot.id, 2).await;

    let summary = checkout::summary(&store, &buyer).await.unwrap();
    assert!(matches!(
        checkout::checkout(&store, &buyer, summary.cart_id, "1 High St").await,
        Err(ShopError::InsufficientStock { available: 1, .. })
    ));
    assert_eq!(stock_of(&store, mug.id).await, 5);
    assert_eq!(stock_of(&store, pot.id).await, 1);
}

#[tokio::test]
async fn concurrent_checkouts_cannot_oversell() {
    let Some(store) = store().await else { return };
    let pot = add_product(&store, &unique("pot"), 4600, 1).await;

    let mut buyers = Vec::new();
    for _ in 0..4 {
        let buyer = add_user(&store, &unique("buyer")).await;
        put_in_cart(&store, &buyer, pot.id, 1).await;
        let cart_id = checkout::summary(&store, &buyer).await.unwrap().cart_id;
        buyers.push((buyer, cart_id));
    }

    let mut tasks = Vec::new();
    for (buyer, cart_id) in buyers {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            checkout::checkout(&store, &buyer, cart_id, "1 High St").await
        }));
    }

    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(ShopError::InsufficientStock { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(stock_of(&store, pot.id).await, 0);
}

#[tokio::test]
async fn one_active_cart_per_user() {
    let Some(store) = store().await else { return };
    let buyer = add_user(&store, &unique("buyer")).await;

    let (first, second) = tokio::join!(cart::view(&store, &buyer), cart::view(&store, &buyer));
    assert_eq!(first.unwrap().cart.id, second.unwrap().cart.id);
}

#[tokio::test]
async fn double_submitted_checkout_places_one_order() {
    let Some(store) = store().await else { return };
    let buyer = add_user(&store, &unique("buyer")).await;
    let mug = add_product(&store, &unique("mug"), 1200, 100).await;
    put_in_cart(&store, &buyer, mug.id, 2).await;
    let cart_id = checkout::summary(&store, &buyer).await.unwrap().cart_id;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        let buyer = buyer.clone();
        tasks.push(tokio::spawn(async move {
            checkout::checkout(&store, &buyer, cart_id, "1 High St").await
        }));
    }

    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(ShopError::NotFound(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(placed, 1);
    assert_eq!(stock_of(&store, mug.id).await, 98);
}
