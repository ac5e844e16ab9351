//! Product catalog reads.

use corner_shop_core::ProductId;
use tracing::instrument;

use super::{OrNotFound, ShopError};
use crate::db::{self, Store, UnitOfWork};
use crate::models::{NewProduct, Product, ProductFilter};

/// Up to `count` in-stock products in random order.
///
/// # Errors
///
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store))]
pub async fn featured<S: Store>(store: &S, count: usize) -> Result<Vec<Product>, ShopError> {
    list(store, ProductFilter::featured(count)).await
}

/// Every product whose name contains `term` (ignoring case), by name.
///
/// # Errors
///
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store))]
pub async fn search<S: Store>(store: &S, term: &str) -> Result<Vec<Product>, ShopError> {
    list(store, ProductFilter::search(term)).await
}

/// A single product.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the product doesn't exist.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store))]
pub async fn detail<S: Store>(store: &S, id: ProductId) -> Result<Product, ShopError> {
    db::atomically(store, move |uow| Box::pin(find_product(uow, id))).await
}

/// Insert a batch of products in one unit of work.
///
/// Either every product is inserted or none is.
///
/// # Errors
///
/// Returns `ShopError::Validation` if a product has a blank name or a
/// negative price; nothing is inserted.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip_all, fields(count = products.len()))]
pub async fn import<S: Store>(
    store: &S,
    products: Vec<NewProduct>,
) -> Result<Vec<Product>, ShopError> {
    for product in &products {
        validate_new_product(product)?;
    }
    db::atomically(store, move |uow| Box::pin(insert_products(uow, products))).await
}

fn validate_new_product(product: &NewProduct) -> Result<(), ShopError> {
    if product.name.trim().is_empty() {
        return Err(ShopError::Validation("Product name cannot be blank".to_owned()));
    }
    if product.price.is_sign_negative() {
        return Err(ShopError::Validation(format!(
            "Price of {} cannot be negative",
            product.name
        )));
    }
    Ok(())
}

async fn list<S: Store>(store: &S, filter: ProductFilter) -> Result<Vec<Product>, ShopError> {
    db::atomically(store, move |uow| Box::pin(matching_products(uow, filter))).await
}

async fn find_product<U: UnitOfWork>(uow: &mut U, id: ProductId) -> Result<Product, ShopError> {
    uow.product(id).await?.or_not_found("product")
}

async fn insert_products<U: UnitOfWork>(
    uow: &mut U,
    products: Vec<NewProduct>,
) -> Result<Vec<Product>, ShopError> {
    let mut inserted = Vec::with_capacity(products.len());
    for product in &products {
        inserted.push(uow.insert_product(product).await?);
    }
    Ok(inserted)
}

async fn matching_products<U: UnitOfWork>(
    uow: &mut U,
    filter: ProductFilter,
) -> Result<Vec<Product>, ShopError> {
    Ok(uow.products(&filter).await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryStore;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        for (name, stock) in [("Teapot", 0), ("Coffee mug", 4), ("Tea mug", 2), ("Spoon", 9)] {
            uow.insert_product(&NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Decimal::new(1200, 2),
                stock,
            })
            .await
            .unwrap();
        }
        uow.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_featured_only_in_stock_and_limited() {
        let store = seeded().await;

        let products = featured(&store, 2).await.unwrap();
        assert_eq!(products.len(), 2);
        assert!(products.iter().all(Product::in_stock));

        let products = featured(&store, 10).await.unwrap();
        assert_eq!(products.len(), 3);
    }

    #[tokio::test]
    async fn test_search_filters_names_case_insensitively() {
        let store = seeded().await;

        let names: Vec<String> = search(&store, "MUG")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Coffee mug", "Tea mug"]);

        assert_eq!(search(&store, "").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_detail_missing_product() {
        let store = seeded().await;
        assert!(matches!(
            detail(&store, ProductId::new(999)).await,
            Err(ShopError::NotFound("product"))
        ));
    }

    #[tokio::test]
    async fn test_import_inserts_all() {
        let store = MemoryStore::new();
        let products = vec![
            NewProduct {
                name: "Kettle".to_owned(),
                description: "Whistles".to_owned(),
                price: Decimal::new(3500, 2),
                stock: 2,
            },
            NewProduct {
                name: "Tray".to_owned(),
                description: String::new(),
                price: Decimal::new(900, 2),
                stock: 0,
            },
        ];

        let inserted = import(&store, products).await.unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(search(&store, "").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_whole_batch() {
        let store = MemoryStore::new();
        let products = vec![
            NewProduct {
                name: "Kettle".to_owned(),
                description: String::new(),
                price: Decimal::new(3500, 2),
                stock: 2,
            },
            NewProduct {
                name: "Refund".to_owned(),
                description: String::new(),
                price: Decimal::new(-100, 2),
                stock: 1,
            },
        ];

        assert!(matches!(
            import(&store, products).await,
            Err(ShopError::Validation(_))
        ));
        assert!(search(&store, "").await.unwrap().is_empty());
    }
}
