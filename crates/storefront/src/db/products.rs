//! Product queries for `PostgreSQL`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use corner_shop_core::ProductId;

use super::{RepositoryError, non_negative, to_db_int};
use crate::models::{NewProduct, Product, ProductFilter, ProductOrder};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, created_at";

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            stock: non_negative(row.stock, "stock")?,
            created_at: row.created_at,
        })
    }
}

/// Get a product by ID.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get(conn: &mut PgConnection, id: ProductId) -> Result<Option<Product>, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Product::try_from).transpose()
}

/// List products matching a filter.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn list(
    conn: &mut PgConnection,
    filter: &ProductFilter,
) -> Result<Vec<Product>, RepositoryError> {
    let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM shop.product WHERE TRUE"
    ));

    if filter.in_stock_only {
        query.push(" AND stock > 0");
    }
    if let Some(term) = &filter.name_contains {
        query
            .push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(term)));
    }

    match filter.order {
        ProductOrder::Name => query.push(" ORDER BY name, id"),
        ProductOrder::Random => query.push(" ORDER BY random()"),
    };

    if let Some(limit) = filter.limit {
        query
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }

    let rows = query
        .build_query_as::<ProductRow>()
        .fetch_all(&mut *conn)
        .await?;

    rows.into_iter().map(Product::try_from).collect()
}

/// Insert a product.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(
    conn: &mut PgConnection,
    product: &NewProduct,
) -> Result<Product, RepositoryError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO shop.product (name, description, price, stock) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price)
    .bind(to_db_int(product.stock, "stock")?)
    .fetch_one(&mut *conn)
    .await?;

    Product::try_from(row)
}

/// Decrement stock if enough units are on hand.
///
/// The guard and the write are one statement, so concurrent decrements on the
/// same row serialise on the row lock and can never take stock below zero.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: u32,
) -> Result<Option<u32>, RepositoryError> {
    let Ok(quantity) = i32::try_from(quantity) else {
        return Ok(None);
    };

    let remaining: Option<(i32,)> = sqlx::query_as(
        r"
        UPDATE shop.product
        SET stock = stock - $2
        WHERE id = $1 AND stock >= $2
        RETURNING stock
        ",
    )
    .bind(id)
    .bind(quantity)
    .fetch_optional(&mut *conn)
    .await?;

    remaining
        .map(|(stock,)| non_negative(stock, "stock"))
        .transpose()
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("mug"), "mug");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
