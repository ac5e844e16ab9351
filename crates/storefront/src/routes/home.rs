//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::Store;
use crate::error::Result;
use crate::filters;
use crate::middleware::{Flash, OptionalAuth};
use crate::routes::{PageContext, ProductView};
use crate::services::catalog;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
}

/// Display the home page with a random selection of in-stock products.
#[instrument(skip_all)]
pub async fn home<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
) -> Result<HomeTemplate> {
    let products =
        catalog::featured(state.store(), state.config().featured_product_count).await?;

    Ok(HomeTemplate {
        page: PageContext::load(user.as_ref(), &flash).await,
        products: ProductView::list(&products, state.config().currency),
    })
}
