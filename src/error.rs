use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("URL parameter is required")]
    MissingUrl,

    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            crate::relay::cors_headers(),
            self.to_string(),
        )
            .into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;
