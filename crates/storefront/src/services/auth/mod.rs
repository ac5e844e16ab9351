//! Authentication service.
//!
//! Username and password accounts, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use corner_shop_core::Username;

use crate::db::{self, RepositoryError, Store, UnitOfWork};
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form input.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Registration {
    pub username: String,
    pub password1: String,
    pub password2: String,
}

/// Register a new user.
///
/// # Errors
///
/// Returns `AuthError::InvalidUsername` if the username format is invalid.
/// Returns `AuthError::PasswordMismatch` if the passwords differ.
/// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
/// Returns `AuthError::UserAlreadyExists` if the username is taken.
#[instrument(skip(store, registration), fields(username = %registration.username))]
pub async fn register<S: Store>(store: &S, registration: &Registration) -> Result<User, AuthError> {
    let username = Username::parse(registration.username.trim())?;

    if registration.password1 != registration.password2 {
        return Err(AuthError::PasswordMismatch);
    }
    validate_password(&registration.password1)?;

    let password_hash = hash_password(&registration.password1)?;

    db::atomically(store, move |uow| {
        Box::pin(create_user(uow, username, password_hash))
    })
    .await
}

/// Check a username and password.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the username/password is wrong.
#[instrument(skip(store, password))]
pub async fn login<S: Store>(store: &S, username: &str, password: &str) -> Result<User, AuthError> {
    let username = Username::parse(username.trim()).map_err(|_| AuthError::InvalidCredentials)?;

    let (user, password_hash) = db::atomically(store, move |uow| {
        Box::pin(find_credentials(uow, username))
    })
    .await?
    .ok_or(AuthError::InvalidCredentials)?;

    verify_password(password, &password_hash)?;

    Ok(user)
}

async fn create_user<U: UnitOfWork>(
    uow: &mut U,
    username: Username,
    password_hash: String,
) -> Result<User, AuthError> {
    uow.insert_user(&username, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
}

async fn find_credentials<U: UnitOfWork>(
    uow: &mut U,
    username: Username,
) -> Result<Option<(User, String)>, AuthError> {
    Ok(uow.user_with_password_hash(&username).await?)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword(
            "This password is entirely numeric.".to_owned(),
        ));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn registration(username: &str, password1: &str, password2: &str) -> Registration {
        Registration {
            username: username.to_owned(),
            password1: password1.to_owned(),
            password2: password2.to_owned(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_password("12345678"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("abcd1234").is_ok());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();

        let user = register(&store, &registration("alice", "s3cret-pass", "s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(user.username.as_str(), "alice");

        let logged_in = login(&store, "alice", "s3cret-pass").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        register(&store, &registration("alice", "s3cret-pass", "s3cret-pass"))
            .await
            .unwrap();

        for (username, password) in [("alice", "nope"), ("bob", "s3cret-pass"), ("", "x")] {
            let err = login(&store, username, password).await.unwrap_err();
            assert_eq!(err.to_string(), "Invalid username or password");
        }
    }

    #[tokio::test]
    async fn test_register_rejections() {
        let store = MemoryStore::new();

        assert!(matches!(
            register(&store, &registration("alice", "s3cret-pass", "other-pass")).await,
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            register(&store, &registration("bad name", "s3cret-pass", "s3cret-pass")).await,
            Err(AuthError::InvalidUsername(_))
        ));

        register(&store, &registration("alice", "s3cret-pass", "s3cret-pass"))
            .await
            .unwrap();
        assert!(matches!(
            register(&store, &registration("alice", "s3cret-pass", "s3cret-pass")).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }
}
