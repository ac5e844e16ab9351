//! Seed the catalog from a YAML file.
//!
//! The file is a list of products:
//!
//! ```yaml
//! - name: Enamel mug
//!   description: Holds 350ml.
//!   price: "12.50"
//!   stock: 24
//! ```

use std::path::Path;

use tracing::info;

use corner_shop_storefront::{db::PgStore, models::NewProduct, services::catalog};

use super::{CommandError, connect};

/// Insert every product listed in `file`, all or nothing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a product is
/// invalid, or the database fails.
pub async fn products(file: &Path) -> Result<(), CommandError> {
    info!(path = %file.display(), "Loading products from file");

    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| CommandError::Io {
            path: file.display().to_string(),
            source,
        })?;
    let products = parse_products(&content)?;
    info!(count = products.len(), "Parsed products");

    let store = PgStore::new(connect().await?);
    let inserted = catalog::import(&store, products).await?;

    for product in &inserted {
        info!(id = %product.id, name = %product.name, stock = product.stock, "Inserted product");
    }
    info!("Seeding complete! {} products inserted", inserted.len());

    Ok(())
}

fn parse_products(content: &str) -> Result<Vec<NewProduct>, CommandError> {
    Ok(serde_yaml::from_str(content)?)
}
