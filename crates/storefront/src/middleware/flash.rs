//! One-shot notices carried across a redirect in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

impl Level {
    /// CSS class used by the base template.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "notice notice-success",
            Self::Info => "notice notice-info",
            Self::Warning => "notice notice-warning",
            Self::Error => "notice notice-error",
        }
    }
}

/// A notice waiting to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

/// Extractor for reading and queueing notices.
///
/// ```rust,ignore
/// async fn handler(flash: Flash) -> Result<Redirect> {
///     flash.success("Saved").await?;
///     Ok(Redirect::to("/"))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Flash(Session);

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self)
    }
}

impl Flash {
    /// Wrap a session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }

    /// Queue a notice for the next rendered page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn push(
        &self,
        level: Level,
        text: impl Into<String>,
    ) -> Result<(), tower_sessions::session::Error> {
        let mut pending: Vec<FlashMessage> = self
            .0
            .get(session_keys::FLASH)
            .await?
            .unwrap_or_default();
        pending.push(FlashMessage {
            level,
            text: text.into(),
        });
        self.0.insert(session_keys::FLASH, pending).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn success(&self, text: impl Into<String>) -> Result<(), tower_sessions::session::Error> {
        self.push(Level::Success, text).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn info(&self, text: impl Into<String>) -> Result<(), tower_sessions::session::Error> {
        self.push(Level::Info, text).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn warning(&self, text: impl Into<String>) -> Result<(), tower_sessions::session::Error> {
        self.push(Level::Warning, text).await
    }

    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn error(&self, text: impl Into<String>) -> Result<(), tower_sessions::session::Error> {
        self.push(Level::Error, text).await
    }

    /// Remove and return every pending notice.
    ///
    /// A session that cannot be read yields no notices.
    pub async fn take(&self) -> Vec<FlashMessage> {
        match self.0.remove(session_keys::FLASH).await {
            Ok(pending) => pending.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read flash messages");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn flash() -> Flash {
        Flash::new(Session::new(None, Arc::new(MemoryStore::default()), None))
    }

    #[tokio::test]
    async fn test_take_drains_in_order() {
        let flash = flash();
        flash.success("Added Mug to cart").await.unwrap();
        flash.warning("Only 2 left.").await.unwrap();

        let messages = flash.take().await;
        assert_eq!(
            messages,
            [
                FlashMessage {
                    level: Level::Success,
                    text: "Added Mug to cart".to_owned()
                },
                FlashMessage {
                    level: Level::Warning,
                    text: "Only 2 left.".to_owned()
                },
            ]
        );
        assert!(flash.take().await.is_empty());
    }

    #[test]
    fn test_css_class() {
        assert_eq!(Level::Error.css_class(), "notice notice-error");
    }
}
