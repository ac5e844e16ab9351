//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use corner_shop_core::OrderId;

use crate::db::Store;
use crate::error::Result;
use crate::filters;
use crate::middleware::{Flash, RequireAuth};
use crate::models::Order;
use crate::routes::{LineView, PageContext};
use crate::services::orders as order_service;
use crate::state::AppState;

/// Order summary display data for templates.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: OrderId,
    pub status: &'static str,
    pub shipping_address: String,
    pub placed_on: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            status: order.status.label(),
            shipping_address: order.shipping_address.clone(),
            placed_on: order.created_at.format("%B %-d, %Y").to_string(),
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderView>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order: OrderView,
    pub lines: Vec<LineView>,
    pub total: String,
}

/// Display the user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
) -> Result<OrdersIndexTemplate> {
    let orders = order_service::list(state.store(), &user).await?;

    Ok(OrdersIndexTemplate {
        page: PageContext::load(Some(&user), &flash).await,
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

/// Display one of the user's orders with the lines it was placed with.
#[instrument(skip(state, user, flash), fields(user_id = %user.id))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    Path(id): Path<OrderId>,
) -> Result<OrderShowTemplate> {
    let detail = order_service::detail(state.store(), &user, id).await?;

    Ok(OrderShowTemplate {
        page: PageContext::load(Some(&user), &flash).await,
        order: OrderView::from(&detail.order),
        lines: LineView::list(&detail.lines, state.config().currency),
        total: state.format_price(detail.total()),
    })
}
