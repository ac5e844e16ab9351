//! User queries for `PostgreSQL`.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use corner_shop_core::{UserId, Username};

use super::{RepositoryError, conflict_on_unique};
use crate::models::User;

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username,
            created_at: row.created_at,
        })
    }
}

/// Internal row type for credential lookups.
#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    id: i32,
    username: String,
    created_at: DateTime<Utc>,
    password_hash: String,
}

/// Create a new user with a password hash.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the username already exists.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert(
    conn: &mut PgConnection,
    username: &Username,
    password_hash: &str,
) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO shop."user" (username, password_hash)
        VALUES ($1, $2)
        RETURNING id, username, created_at
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| conflict_on_unique(e, "username"))?;

    User::try_from(row)
}

/// Get a user together with their password hash.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if the stored username is invalid.
pub async fn with_password_hash(
    conn: &mut PgConnection,
    username: &Username,
) -> Result<Option<(User, String)>, RepositoryError> {
    let row = sqlx::query_as::<_, UserWithHashRow>(
        r#"
        SELECT id, username, created_at, password_hash
        FROM shop."user"
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| {
        let user = User::try_from(UserRow {
            id: r.id,
            username: r.username,
            created_at: r.created_at,
        })?;
        Ok((user, r.password_hash))
    })
    .transpose()
}
