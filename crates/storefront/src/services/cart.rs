//! Active cart operations.
//!
//! Every mutation works on the caller's own active cart: line items are looked
//! up by ID *and* owning user, and a quantity is only ever raised after
//! re-reading the product's current stock.

use rust_decimal::Decimal;
use tracing::{instrument, warn};

use corner_shop_core::{CartItemId, ProductId, UserId};

use super::{OrNotFound, ShopError};
use crate::db::{self, GetOrCreate, Store, UnitOfWork};
use crate::models::cart::{cart_total, item_count};
use crate::models::{Cart, CartLine, CurrentUser};

/// The active cart with its lines.
#[derive(Debug, Clone)]
pub struct CartView {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartView {
    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        cart_total(&self.lines)
    }

    /// Total number of units.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        item_count(&self.lines)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Result of adding a product to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was created with quantity 1.
    Added { name: String },
    /// An existing line was incremented.
    Incremented { name: String, quantity: u32 },
    /// The line already holds every unit on hand; nothing changed.
    StockLimitReached { name: String, stock: u32 },
    /// The product has no stock; nothing changed.
    OutOfStock,
}

impl AddOutcome {
    /// Notice shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Added { name } => format!("Added {name} to cart"),
            Self::Incremented { name, quantity } => {
                format!("Updated {name} quantity to {quantity}")
            }
            Self::StockLimitReached { name, stock } => {
                format!("Cannot add more {name}. Only {stock} left.")
            }
            Self::OutOfStock => "This product is out of stock.".to_owned(),
        }
    }
}

/// Result of setting a line's quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { quantity: u32 },
    /// More units were requested than are on hand; nothing changed.
    ExceedsStock { stock: u32 },
    /// A quantity of zero or less removes the line.
    Removed,
}

impl UpdateOutcome {
    /// Notice shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Updated { quantity } => format!("Updated quantity to {quantity}"),
            Self::ExceedsStock { stock } => format!("Only {stock} available in stock."),
            Self::Removed => "Item removed from cart".to_owned(),
        }
    }
}

/// Parse the `quantity` form field. A missing field means 1.
///
/// # Errors
///
/// Returns `ShopError::Validation` if the value is not an integer.
pub fn parse_quantity(raw: Option<&str>) -> Result<i64, ShopError> {
    let Some(raw) = raw else {
        return Ok(1);
    };
    raw.trim()
        .parse()
        .map_err(|_| ShopError::Validation("Quantity must be a whole number".to_owned()))
}

/// The caller's active cart, created if absent.
///
/// # Errors
///
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn view<S: Store>(store: &S, user: &CurrentUser) -> Result<CartView, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| Box::pin(load_active_cart(uow, user_id))).await
}

/// Add one unit of a product to the caller's active cart.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the product doesn't exist.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn add<S: Store>(
    store: &S,
    user: &CurrentUser,
    product_id: ProductId,
) -> Result<AddOutcome, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| {
        Box::pin(add_product(uow, user_id, product_id))
    })
    .await
}

/// Remove a line from the caller's active cart, returning the product name.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the line is not in the caller's active cart.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn remove<S: Store>(
    store: &S,
    user: &CurrentUser,
    item_id: CartItemId,
) -> Result<String, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| Box::pin(remove_line(uow, user_id, item_id))).await
}

/// Set a line's quantity. Zero or less removes the line.
///
/// # Errors
///
/// Returns `ShopError::NotFound` if the line is not in the caller's active cart.
/// Returns `ShopError::Repository` if the store fails.
#[instrument(skip(store, user), fields(user_id = %user.id))]
pub async fn update_quantity<S: Store>(
    store: &S,
    user: &CurrentUser,
    item_id: CartItemId,
    quantity: i64,
) -> Result<UpdateOutcome, ShopError> {
    let user_id = user.id;
    db::atomically(store, move |uow| {
        Box::pin(set_line_quantity(uow, user_id, item_id, quantity))
    })
    .await
}

async fn load_active_cart<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
) -> Result<CartView, ShopError> {
    let cart = uow.get_or_create_active_cart(user_id).await?.into_inner();
    let lines = uow.cart_lines(cart.id).await?;
    Ok(CartView { cart, lines })
}

async fn add_product<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    product_id: ProductId,
) -> Result<AddOutcome, ShopError> {
    let product = uow.product(product_id).await?.or_not_found("product")?;
    if !product.in_stock() {
        return Ok(AddOutcome::OutOfStock);
    }

    let cart = uow.get_or_create_active_cart(user_id).await?.into_inner();

    match uow.get_or_create_cart_item(cart.id, product.id).await? {
        GetOrCreate::Created(_) => Ok(AddOutcome::Added { name: product.name }),
        GetOrCreate::Found(item) => {
            let wanted = item.quantity.saturating_add(1);
            if product.can_supply(wanted) {
                uow.set_cart_item_quantity(item.id, wanted).await?;
                Ok(AddOutcome::Incremented {
                    name: product.name,
                    quantity: wanted,
                })
            } else {
                warn!(
                    product_id = %product.id,
                    stock = product.stock,
                    "Refused to add beyond available stock"
                );
                Ok(AddOutcome::StockLimitReached {
                    name: product.name,
                    stock: product.stock,
                })
            }
        }
    }
}

async fn remove_line<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    item_id: CartItemId,
) -> Result<String, ShopError> {
    let line = uow
        .owned_cart_line(user_id, item_id)
        .await?
        .or_not_found("cart item")?;
    uow.delete_cart_item(line.item.id).await?;
    Ok(line.product.name)
}

async fn set_line_quantity<U: UnitOfWork>(
    uow: &mut U,
    user_id: UserId,
    item_id: CartItemId,
    quantity: i64,
) -> Result<UpdateOutcome, ShopError> {
    let line = uow
        .owned_cart_line(user_id, item_id)
        .await?
        .or_not_found("cart item")?;

    if quantity <= 0 {
        uow.delete_cart_item(line.item.id).await?;
        return Ok(UpdateOutcome::Removed);
    }

    let stock = line.product.stock;
    match u32::try_from(quantity) {
        Ok(quantity) if line.product.can_supply(quantity) => {
            uow.set_cart_item_quantity(line.item.id, quantity).await?;
            Ok(UpdateOutcome::Updated { quantity })
        }
        _ => {
            warn!(
                product_id = %line.product.id,
                requested = quantity,
                stock,
                "Refused quantity beyond available stock"
            );
            Ok(UpdateOutcome::ExceedsStock { stock })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use corner_shop_core::Username;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;

    fn shopper(id: i32, name: &str) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: Username::parse(name).unwrap(),
        }
    }

    async fn with_product(store: &MemoryStore, name: &str, stock: u32) -> ProductId {
        let mut uow = store.begin().await.unwrap();
        let product = uow
            .insert_product(&NewProduct {
                name: name.to_owned(),
                description: String::new(),
                price: Decimal::new(350, 2),
                stock,
            })
            .await
            .unwrap();
        uow.commit().await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn test_view_creates_empty_cart_once() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");

        let first = view(&store, &alice).await.unwrap();
        let second = view(&store, &alice).await.unwrap();
        assert!(first.is_empty());
        assert_eq!(first.cart.id, second.cart.id);
        assert_eq!(second.total(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_add_twice_with_single_unit_in_stock() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");
        let lamp = with_product(&store, "Lamp", 1).await;

        let first = add(&store, &alice, lamp).await.unwrap();
        assert_eq!(first.message(), "Added Lamp to cart");

        let second = add(&store, &alice, lamp).await.unwrap();
        assert_eq!(
            second,
            AddOutcome::StockLimitReached {
                name: "Lamp".to_owned(),
                stock: 1
            }
        );
        assert_eq!(second.message(), "Cannot add more Lamp. Only 1 left.");

        let cart = view(&store, &alice).await.unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].item.quantity, 1);
    }

    #[tokio::test]
    async fn test_add_increments_existing_line() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");
        let mug = with_product(&store, "Mug", 5).await;

        add(&store, &alice, mug).await.unwrap();
        let outcome = add(&store, &alice, mug).await.unwrap();
        assert_eq!(outcome.message(), "Updated Mug quantity to 2");

        let cart = view(&store, &alice).await.unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total(), Decimal::new(700, 2));
    }

    #[tokio::test]
    async fn test_add_out_of_stock_creates_nothing() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");
        let gone = with_product(&store, "Gone", 0).await;

        assert_eq!(add(&store, &alice, gone).await.unwrap(), AddOutcome::OutOfStock);

        let mut uow = store.begin().await.unwrap();
        assert!(uow.active_cart(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_unknown_product() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");
        assert!(matches!(
            add(&store, &alice, ProductId::new(404)).await,
            Err(ShopError::NotFound("product"))
        ));
    }

    #[tokio::test]
    async fn test_update_quantity_respects_stock() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");
        let mug = with_product(&store, "Mug", 3).await;
        add(&store, &alice, mug).await.unwrap();
        let item = view(&store, &alice).await.unwrap().lines[0].item.id;

        let outcome = update_quantity(&store, &alice, item, 3).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated { quantity: 3 });

        let outcome = update_quantity(&store, &alice, item, 4).await.unwrap();
        assert_eq!(outcome.message(), "Only 3 available in stock.");
        assert_eq!(view(&store, &alice).await.unwrap().lines[0].item.quantity, 3);

        let outcome = update_quantity(&store, &alice, item, 0).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Removed);
        assert!(view(&store, &alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_users_lines_are_not_found() {
        let store = MemoryStore::new();
        let alice = shopper(1, "alice");
        let mallory = shopper(2, "mallory");
        let mug = with_product(&store, "Mug", 3).await;
        add(&store, &alice, mug).await.unwrap();
        let item = view(&store, &alice).await.unwrap().lines[0].item.id;

        assert!(matches!(
            update_quantity(&store, &mallory, item, 2).await,
            Err(ShopError::NotFound("cart item"))
        ));
        assert!(matches!(
            remove(&store, &mallory, item).await,
            Err(ShopError::NotFound("cart item"))
        ));
        assert_eq!(view(&store, &alice).await.unwrap().lines.len(), 1);

        assert_eq!(remove(&store, &alice, item).await.unwrap(), "Mug");
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(None).unwrap(), 1);
        assert_eq!(parse_quantity(Some(" 4 ")).unwrap(), 4);
        assert_eq!(parse_quantity(Some("-2")).unwrap(), -2);
        assert!(matches!(
            parse_quantity(Some("two")),
            Err(ShopError::Validation(_))
        ));
    }
}
