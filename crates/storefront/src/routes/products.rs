//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use corner_shop_core::ProductId;

use crate::db::Store;
use crate::error::Result;
use crate::filters;
use crate::middleware::{Flash, OptionalAuth};
use crate::routes::{PageContext, ProductView};
use crate::services::catalog;
use crate::state::AppState;

/// Product listing query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    /// The search term, echoed back into the search box.
    pub search: String,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductView,
}

/// Display product listing page, optionally filtered by name.
#[instrument(skip(state, user, flash))]
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
    Query(query): Query<SearchQuery>,
) -> Result<ProductsIndexTemplate> {
    let search = query.search.unwrap_or_default();
    let products = catalog::search(state.store(), &search).await?;

    Ok(ProductsIndexTemplate {
        page: PageContext::load(user.as_ref(), &flash).await,
        products: ProductView::list(&products, state.config().currency),
        search,
    })
}

/// Display product detail page.
#[instrument(skip(state, user, flash))]
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
    Path(id): Path<ProductId>,
) -> Result<ProductShowTemplate> {
    let product = catalog::detail(state.store(), id).await?;

    Ok(ProductShowTemplate {
        page: PageContext::load(user.as_ref(), &flash).await,
        product: ProductView::new(&product, state.config().currency),
    })
}
