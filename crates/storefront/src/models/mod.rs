//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem, CartLine};
pub use order::{NewOrder, Order};
pub use product::{NewProduct, Product, ProductFilter, ProductOrder};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
