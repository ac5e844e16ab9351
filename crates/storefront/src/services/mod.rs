//! Business logic services for the storefront.
//!
//! Every operation takes the store and, where it acts for a user, the caller's
//! [`CurrentUser`](crate::models::CurrentUser) explicitly. Each runs in a single
//! unit of work via [`db::atomically`](crate::db::atomically).
//!
//! # Services
//!
//! - `auth` - Registration and password login (Argon2id)
//! - `catalog` - Featured products, search and product detail
//! - `cart` - Active cart view and line item mutations
//! - `checkout` - The atomic checkout transaction
//! - `orders` - Order history

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use thiserror::Error;

use corner_shop_core::ProductId;

use crate::db::RepositoryError;

/// Errors returned by the shop services.
///
/// Everything except `Repository` is a recoverable, user-facing condition and
/// its `Display` text is shown to the user as-is.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Bad or missing user input.
    #[error("{0}")]
    Validation(String),

    /// Referenced entity is absent or not owned by the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Checkout was attempted on a cart without items.
    #[error("Your cart is empty")]
    EmptyCart,

    /// A line asks for more units than are on hand.
    #[error("Not enough stock for {product_name}. Only {available} available.")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: u32,
    },

    /// Storage failure.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ShopError {
    /// Whether the error should be shown to the user rather than treated as a
    /// server failure.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_))
    }
}

/// Turn an optional lookup into `ShopError::NotFound`.
pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, what: &'static str) -> Result<T, ShopError>;
}

impl<T> OrNotFound<T> for Option<T> {
    fn or_not_found(self, what: &'static str) -> Result<T, ShopError> {
        self.ok_or(ShopError::NotFound(what))
    }
}
