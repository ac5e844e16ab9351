//! User domain types.

use chrono::{DateTime, Utc};

use corner_shop_core::{UserId, Username};

/// A storefront user (domain type).
///
/// The password hash is deliberately not part of this type; it is only read
/// by the credential check in [`crate::services::auth`].
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}
