//! Cart route handlers.
//!
//! Every cart action works on the logged-in user's active cart. Mutations
//! answer with a redirect and leave their outcome as a flash notice.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use corner_shop_core::{CartItemId, ProductId};

use crate::db::Store;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{Flash, RequireAuth};
use crate::routes::{LineView, PageContext};
use crate::services::ShopError;
use crate::services::cart::{self as cart_service, AddOutcome, UpdateOutcome};
use crate::state::AppState;

/// Shown when a cart item is missing or belongs to someone else.
pub const MISSING_ITEM: &str = "That item is no longer in your cart";

/// Update quantity form data.
///
/// Kept as a string so a non-numeric value becomes a notice, not a 422.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub quantity: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub lines: Vec<LineView>,
    pub total: String,
    pub item_count: u32,
}

/// Display cart page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
) -> Result<CartShowTemplate> {
    let cart = cart_service::view(state.store(), &user).await?;
    let currency = state.config().currency;

    Ok(CartShowTemplate {
        page: PageContext::load(Some(&user), &flash).await,
        lines: LineView::list(&cart.lines, currency),
        total: state.format_price(cart.total()),
        item_count: cart.item_count(),
    })
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, user, flash), fields(user_id = %user.id))]
pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    Path(product_id): Path<ProductId>,
) -> Result<Redirect> {
    let outcome = cart_service::add(state.store(), &user, product_id).await?;
    let message = outcome.message();

    match outcome {
        AddOutcome::OutOfStock => {
            flash.error(message).await?;
            return Ok(Redirect::to(&format!("/products/{product_id}")));
        }
        AddOutcome::Added { .. } | AddOutcome::Incremented { .. } => {
            let id = product_id.to_string();
            add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())]));
            flash.success(message).await?;
        }
        AddOutcome::StockLimitReached { .. } => flash.warning(message).await?,
    }

    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(state, user, flash), fields(user_id = %user.id))]
pub async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    Path(item_id): Path<CartItemId>,
) -> Result<Redirect> {
    let name = match cart_service::remove(state.store(), &user, item_id).await {
        Ok(name) => name,
        Err(ShopError::NotFound(_)) => return missing_item(&flash).await,
        Err(e) => return Err(e.into()),
    };
    flash.success(format!("Removed {name} from cart")).await?;
    Ok(Redirect::to("/cart"))
}

/// Set a line's quantity; zero or less removes it.
#[instrument(skip(state, user, flash, form), fields(user_id = %user.id))]
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(user): RequireAuth,
    flash: Flash,
    Path(item_id): Path<CartItemId>,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let quantity = match cart_service::parse_quantity(form.quantity.as_deref()) {
        Ok(quantity) => quantity,
        Err(ShopError::Validation(message)) => {
            flash.error(message).await?;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let updated = cart_service::update_quantity(state.store(), &user, item_id, quantity).await;
    let outcome = match updated {
        Ok(outcome) => outcome,
        Err(ShopError::NotFound(_)) => return Ok(missing_item(&flash).await?.into_response()),
        Err(e) => return Err(e.into()),
    };
    match &outcome {
        UpdateOutcome::Updated { .. } | UpdateOutcome::Removed => {
            flash.success(outcome.message()).await?;
        }
        UpdateOutcome::ExceedsStock { .. } => flash.warning(outcome.message()).await?,
    }

    Ok(Redirect::to("/cart").into_response())
}

/// Notice for an item that is not in the caller's active cart.
async fn missing_item(flash: &Flash) -> Result<Redirect> {
    flash.error(MISSING_ITEM).await?;
    Ok(Redirect::to("/cart"))
}
