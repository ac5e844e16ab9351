//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page (random in-stock products)
//! GET  /health                    - Health check
//! GET  /health/ready              - Readiness check (database)
//!
//! # Products
//! GET  /products?search=term      - Product listing
//! GET  /products/{id}             - Product detail
//!
//! # Cart (requires auth)
//! GET  /cart                      - Cart page
//! POST /cart/add/{product_id}     - Add one unit
//! POST /cart/remove/{item_id}     - Remove a line
//! POST /cart/update/{item_id}     - Set a line's quantity
//!
//! # Checkout (requires auth)
//! GET  /checkout                  - Shipping address form
//! POST /checkout                  - Place the order
//!
//! # Orders (requires auth)
//! GET  /orders                    - Order history
//! GET  /orders/{id}               - Order detail
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;
pub mod orders;
pub mod products;
mod views;

pub use views::{LineView, PageContext, ProductView};

use axum::{
    Router,
    routing::{get, post},
};

use crate::db::Store;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login::<S>))
        .route(
            "/register",
            get(auth::register_page).post(auth::register::<S>),
        )
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(products::index::<S>))
        .route("/{id}", get(products::show::<S>))
}

/// Create the cart routes router.
pub fn cart_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>))
        .route("/add/{product_id}", post(cart::add::<S>))
        .route("/remove/{item_id}", post(cart::remove::<S>))
        .route("/update/{item_id}", post(cart::update::<S>))
}

/// Create the order routes router.
pub fn order_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>))
        .route("/{id}", get(orders::show::<S>))
}

/// Create all routes for the storefront.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(home::home::<S>))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route(
            "/checkout",
            get(checkout::show::<S>).post(checkout::place::<S>),
        )
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
}
