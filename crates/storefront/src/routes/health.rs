//! Health check endpoints.

use axum::{extract::State, http::StatusCode};

use crate::db::{Store, UnitOfWork};
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Opens and rolls back a unit of work to prove the store is reachable.
/// Returns 503 Service Unavailable if it is not.
pub async fn readiness<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
    let probe = match state.store().begin().await {
        Ok(uow) => uow.rollback().await,
        Err(e) => Err(e),
    };

    match probe {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
