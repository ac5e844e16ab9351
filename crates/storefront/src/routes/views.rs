//! Display data shared by templates.

use corner_shop_core::{CartItemId, CurrencyCode, Price, ProductId};

use crate::middleware::{Flash, FlashMessage};
use crate::models::{CartLine, CurrentUser, Product};

/// Layout data every page needs: who is logged in and pending notices.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub username: Option<String>,
    pub messages: Vec<FlashMessage>,
}

impl PageContext {
    /// Build the layout context, consuming any queued flash messages.
    pub async fn load(user: Option<&CurrentUser>, flash: &Flash) -> Self {
        Self {
            username: user.map(|u| u.username.to_string()),
            messages: flash.take().await,
        }
    }
}

/// Product display data for templates.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: u32,
    pub in_stock: bool,
}

impl ProductView {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: Price::new(product.price, currency).display(),
            stock: product.stock,
            in_stock: product.in_stock(),
        }
    }

    #[must_use]
    pub fn list(products: &[Product], currency: CurrencyCode) -> Vec<Self> {
        products.iter().map(|p| Self::new(p, currency)).collect()
    }
}

/// Cart or order line display data for templates.
#[derive(Debug, Clone)]
pub struct LineView {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
    /// Units currently on hand, for the quantity input's upper bound.
    pub stock: u32,
}

impl LineView {
    #[must_use]
    pub fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            item_id: line.item.id,
            product_id: line.product.id,
            name: line.product.name.clone(),
            unit_price: Price::new(line.product.price, currency).display(),
            quantity: line.item.quantity,
            line_total: Price::new(line.line_total(), currency).display(),
            stock: line.product.stock,
        }
    }

    #[must_use]
    pub fn list(lines: &[CartLine], currency: CurrencyCode) -> Vec<Self> {
        lines.iter().map(|l| Self::new(l, currency)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use corner_shop_core::CartId;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::CartItem;

    fn mug() -> Product {
        Product {
            id: ProductId::new(7),
            name: "Mug".to_owned(),
            description: "Holds coffee".to_owned(),
            price: Decimal::new(1250, 2),
            stock: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_view_formats_price() {
        let view = ProductView::new(&mug(), CurrencyCode::GBP);
        assert_eq!(view.price, "£12.50");
        assert!(view.in_stock);
    }

    #[test]
    fn test_line_view_totals() {
        let line = CartLine {
            item: CartItem {
                id: CartItemId::new(1),
                cart_id: CartId::new(1),
                product_id: ProductId::new(7),
                quantity: 2,
            },
            product: mug(),
        };

        let view = LineView::new(&line, CurrencyCode::USD);
        assert_eq!(view.unit_price, "$12.50");
        assert_eq!(view.line_total, "$25.00");
        assert_eq!(view.quantity, 2);
    }
}
