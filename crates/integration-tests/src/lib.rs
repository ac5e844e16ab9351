//! Integration tests for Corner Shop.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory store only
//! cargo test -p corner-shop-integration-tests
//!
//! # Also exercise PostgreSQL
//! TEST_DATABASE_URL=postgres://localhost/corner_shop_test cargo test -p corner-shop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - Checkout scenarios and atomicity
//! - `cart_ownership` - Cross-user isolation
//! - `storefront_http` - Full HTTP flows against a live server
//! - `postgres_store` - The same guarantees on `PostgreSQL` (needs `TEST_DATABASE_URL`)

use std::net::SocketAddr;

use reqwest::{Client, redirect};
use rust_decimal::Decimal;
use secrecy::SecretString;
use url::Url;

use corner_shop_core::{ProductId, UserId};
use corner_shop_storefront::{
    config::StorefrontConfig,
    db::{self, Store, UnitOfWork},
    middleware::session_layer,
    models::{CurrentUser, NewProduct, Product},
    services::{
        ShopError,
        auth::{self, Registration},
        catalog,
    },
    state::AppState,
};

/// Password given to every user created by [`add_user`].
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A storefront served on an ephemeral local port.
pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    /// Serve the full application over `store`, with in-memory sessions.
    pub async fn start<S: Store>(store: S) -> Self {
        let config = StorefrontConfig::new(
            SecretString::from("postgres://unused"),
            Url::parse("http://127.0.0.1").expect("valid url"),
        );
        let state = AppState::new(config, store);
        let sessions = session_layer(tower_sessions::MemoryStore::default(), false);
        let app = corner_shop_storefront::app(state, sessions);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self { addr }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A client with its own cookie jar that does not follow redirects.
    #[must_use]
    pub fn client() -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }
}

/// Insert a product priced at `cents` hundredths.
pub async fn add_product<S: Store>(store: &S, name: &str, cents: i64, stock: u32) -> Product {
    let mut inserted = catalog::import(
        store,
        vec![NewProduct {
            name: name.to_owned(),
            description: format!("{name} for testing"),
            price: Decimal::new(cents, 2),
            stock,
        }],
    )
    .await
    .expect("Failed to insert product");
    inserted.pop().expect("one product inserted")
}

/// Register a user with [`TEST_PASSWORD`].
pub async fn add_user<S: Store>(store: &S, username: &str) -> CurrentUser {
    let user = auth::register(
        store,
        &Registration {
            username: username.to_owned(),
            password1: TEST_PASSWORD.to_owned(),
            password2: TEST_PASSWORD.to_owned(),
        },
    )
    .await
    .expect("Failed to register user");
    CurrentUser::from(&user)
}

/// Put `quantity` units of a product in the user's active cart, bypassing
/// the stock checks the cart service applies.
pub async fn put_in_cart<S: Store>(
    store: &S,
    user: &CurrentUser,
    product_id: ProductId,
    quantity: u32,
) {
    let user_id = user.id;
    db::atomically(store, move |uow| {
        Box::pin(set_line(uow, user_id, product_id, quantity))
    })
    .await
    .expect("Failed to fill cart");
}

async fn set_line<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    product_id: ProductId,
    quantity: u32,
) -> Result<(), ShopError> {
    let cart = uow.get_or_create_active_cart(user_id).await?.into_inner();
    let item = uow
        .get_or_create_cart_item(cart.id, product_id)
        .await?
        .into_inner();
    uow.set_cart_item_quantity(item.id, quantity).await?;
    Ok(())
}

/// Current stock of a product.
pub async fn stock_of<S: Store>(store: &S, product_id: ProductId) -> u32 {
    catalog::detail(store, product_id)
        .await
        .expect("product exists")
        .stock
}
