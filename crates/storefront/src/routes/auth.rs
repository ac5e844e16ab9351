//! Authentication route handlers.
//!
//! Username and password login backed by the local user table. A successful
//! login or registration rotates the session ID before storing the user.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::Store;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    Flash, OptionalAuth, clear_current_user, is_safe_next, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::routes::PageContext;
use crate::services::auth::{self as auth_service, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    /// Where to go after logging in; only same-site paths are kept.
    pub next: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub username: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(user): OptionalAuth,
    flash: Flash,
    Query(query): Query<NextQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        page: PageContext::load(user.as_ref(), &flash).await,
        username: String::new(),
        next: query.next.filter(|n| is_safe_next(n)),
    }
}

/// Handle login form submission.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    flash: Flash,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = form.next.filter(|n| is_safe_next(n));

    match auth_service::login(state.store(), &form.username, &form.password).await {
        Ok(user) => {
            log_in(&session, &user).await?;
            flash.success("Login successful!").await?;
            Ok(Redirect::to(next.as_deref().unwrap_or("/")).into_response())
        }
        Err(e) if e.is_user_facing() => {
            tracing::warn!(error = %e, "Login failed");
            flash.error(e.to_string()).await?;
            Ok(LoginTemplate {
                page: PageContext::load(None, &flash).await,
                username: form.username,
                next,
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(OptionalAuth(user): OptionalAuth, flash: Flash) -> impl IntoResponse {
    RegisterTemplate {
        page: PageContext::load(user.as_ref(), &flash).await,
        username: String::new(),
    }
}

/// Handle registration form submission.
///
/// A new account is logged in straight away.
#[instrument(skip_all, fields(username = %form.username))]
pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    flash: Flash,
    Form(form): Form<Registration>,
) -> Result<Response> {
    match auth_service::register(state.store(), &form).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            log_in(&session, &user).await?;
            flash.success("Registration successful!").await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if e.is_user_facing() => {
            tracing::warn!(error = %e, "Registration failed");
            flash.error(e.to_string()).await?;
            Ok(RegisterTemplate {
                page: PageContext::load(None, &flash).await,
                username: form.username,
            }
            .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
pub async fn logout(session: Session, flash: Flash) -> Result<Redirect> {
    clear_current_user(&session).await?;
    session.cycle_id().await?;
    clear_sentry_user();

    flash.success("Logged out successfully").await?;
    Ok(Redirect::to("/"))
}

async fn log_in(session: &Session, user: &User) -> Result<()> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current).await?;
    set_sentry_user(&current.id, current.username.as_str());
    Ok(())
}
