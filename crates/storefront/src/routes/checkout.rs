//! Checkout route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::Store;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Flash, RequireAuth};
use crate::models::CurrentUser;
use crate::routes::{LineView, PageContext};
use crate::services::ShopError;
use crate::services::checkout::{self as checkout_service, CheckoutSummary};
use crate::state::AppState;

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub shipping_address: String,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub lines: Vec<LineView>,
    pub total: String,
    /// Previously submitted address, echoed back after a failed attempt.
    pub shipping_address: String,
}

impl CheckoutTemplate {
    async fn build<S: Store>(
        state: &AppState<S>,
        user: &CurrentUser,
        flash: &Flash,
        summary: &CheckoutSummary,
        shipping_address: String,
    ) -> Self {
        Self {
            page: PageContext::load(Some(user), flash).await,
            lines: LineView::list(&summary.lines, state.config().currency),
            total: state.format_price(summary.total()),
            shipping_address,
        }
    }
}

/// Display the checkout form for the active cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
) -> Result<Response> {
    let summary = match checkout_service::summary(state.store(), &user).await {
        Ok(summary) => summary,
        Err(e) => return back_to_cart(&flash, e).await,
    };

    Ok(
        CheckoutTemplate::build(&state, &user, &flash, &summary, String::new())
            .await
            .into_response(),
    )
}

/// Place an order for the active cart.
///
/// A blank address re-renders the form. Cart problems (empty, short on
/// stock, no active cart) send the user back to the cart with a notice.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let summary = match checkout_service::summary(state.store(), &user).await {
        Ok(summary) => summary,
        Err(e) => return back_to_cart(&flash, e).await,
    };

    match checkout_service::checkout(
        state.store(),
        &user,
        summary.cart_id,
        &form.shipping_address,
    )
    .await
    {
        Ok(order) => {
            let id = order.id.to_string();
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", id.as_str())]));
            flash
                .success(format!("Order #{id} created successfully!"))
                .await?;
            Ok(Redirect::to(&format!("/orders/{id}")).into_response())
        }
        Err(ShopError::Validation(message)) => {
            flash.error(message).await?;
            Ok(
                CheckoutTemplate::build(&state, &user, &flash, &summary, form.shipping_address)
                    .await
                    .into_response(),
            )
        }
        Err(e) => back_to_cart(&flash, e).await,
    }
}

/// Show a cart problem as a notice on the cart page.
async fn back_to_cart(flash: &Flash, err: ShopError) -> Result<Response> {
    if !err.is_user_facing() {
        return Err(err.into());
    }

    let message = match err {
        ShopError::NotFound(_) => ShopError::EmptyCart.to_string(),
        other => other.to_string(),
    };

    flash.error(message).await?;
    Ok(Redirect::to("/cart").into_response())
}
