//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username format.
    #[error("{0}")]
    InvalidUsername(#[from] corner_shop_core::UsernameError),

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// User already exists.
    #[error("A user with that username already exists.")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Confirmation doesn't match.
    #[error("The two password fields didn't match.")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the error is a form problem the user can fix.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
