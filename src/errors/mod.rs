use std::io;

use axum::{http::StatusCode, response::{IntoResponse, Response}};
use thiserror::Error;

/// Failures raised by a page store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No stored page carries this title
    #[error("{0}: no page exists")]
    NotFound(String),

    /// Driver, connectivity or schema failure
    #[error("store error during {context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: sqlx::Error,
    },
}

impl StoreError {
    pub fn backend(context: impl Into<String>, source: sqlx::Error) -> Self {
        StoreError::Backend { context: context.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// A request path that does not name a wiki action on a page title
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route for path {0:?}")]
pub struct RouteMismatch(pub String);

/// Custom error types for the wiki application
#[derive(Debug, Error)]
pub enum WikiError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Route(#[from] RouteMismatch),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Malformed form data: {0}")]
    BadForm(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for WikiError {
    fn into_response(self) -> Response {
        match self {
            WikiError::Route(_) => (StatusCode::NOT_FOUND, "404 page not found").into_response(),
            WikiError::BadForm(_) => {
                log::warn!("Rejected request: {}", self);
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            other => {
                log::error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response()
            }
        }
    }
}
