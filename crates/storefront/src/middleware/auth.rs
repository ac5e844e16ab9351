//! Authentication extractors.
//!
//! The logged-in identity is a [`CurrentUser`] stored in the session. Handlers
//! take it from these extractors and pass it explicitly into services.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// Anonymous requests are redirected to `/auth/login?next=<path>`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, coming back to `next` afterwards.
    RedirectToLogin { next: String },
    /// The session layer is not installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                Redirect::to(&format!("/auth/login?next={}", urlencoding::encode(&next)))
                    .into_response()
            }
            Self::MissingSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::MissingSession)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AuthRejection::RedirectToLogin {
                next: requested_path(parts),
            })?;

        Ok(Self(user))
    }
}

/// Path and query the client asked for.
///
/// Nested routers strip their prefix from `parts.uri`, so prefer the
/// `OriginalUri` the router records.
fn requested_path(parts: &Parts) -> String {
    let uri: &Uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    uri.path_and_query()
        .map_or_else(|| uri.path().to_owned(), ToString::to_string)
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if the user is not logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Log a user in: rotate the session ID and store their identity.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log the current user out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

/// Whether `next` is a same-site path that is safe to redirect to after login.
#[must_use]
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, http::header, routing::get};
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use corner_shop_core::{UserId, Username};

    use super::*;

    async fn whoami(RequireAuth(user): RequireAuth) -> String {
        user.username.to_string()
    }

    async fn maybe(OptionalAuth(user): OptionalAuth) -> String {
        user.map_or_else(|| "guest".to_owned(), |u| u.username.to_string())
    }

    async fn login(session: Session) -> StatusCode {
        let user = CurrentUser {
            id: UserId::new(1),
            username: Username::parse("alice").unwrap(),
        };
        set_current_user(&session, &user).await.unwrap();
        StatusCode::NO_CONTENT
    }

    fn app() -> Router {
        Router::new()
            .route("/orders", get(whoami))
            .route("/maybe", get(maybe))
            .route("/login", get(login))
            .nest(
                "/cart",
                Router::new()
                    .route("/", get(whoami))
                    .route("/remove/{id}", get(whoami)),
            )
            .layer(SessionManagerLayer::new(MemoryStore::default()))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_request_redirects_with_next() {
        let response = app()
            .oneshot(Request::get("/orders?page=2").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Forders%3Fpage%3D2"
        );
    }

    #[tokio::test]
    async fn test_nested_route_redirect_keeps_full_path() {
        for (path, expected) in [
            ("/cart", "/auth/login?next=%2Fcart"),
            ("/cart/remove/7", "/auth/login?next=%2Fcart%2Fremove%2F7"),
        ] {
            let response = app()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], expected, "{path}");
        }
    }

    #[tokio::test]
    async fn test_logged_in_request_passes() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_owned();

        let response = app
            .oneshot(
                Request::get("/orders")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "alice");
    }

    #[tokio::test]
    async fn test_optional_auth_without_login() {
        let response = app()
            .oneshot(Request::get("/maybe").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "guest");
    }

    #[test]
    fn test_is_safe_next() {
        assert!(is_safe_next("/orders/3"));
        assert!(!is_safe_next("https://evil.example"));
        assert!(!is_safe_next("//evil.example"));
        assert!(!is_safe_next("/\\evil.example"));
    }
}
