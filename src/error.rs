use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the relay service
#[derive(Error, Debug)]
pub enum RelayError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Proxy source errors
    #[error("Unknown proxy source: {0}")]
    UnknownSource(String),

    #[error("Failed to parse proxy list: {0}")]
    ProxyListParse(String),

    // Authentication errors
    #[error("Unauthorized: Missing Bearer Token")]
    MissingAuthHeader,

    #[error("Unauthorized: Invalid Bearer Token")]
    InvalidToken,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request errors
    #[error("{0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            RelayError::InvalidRequest(_)
            | RelayError::UnknownSource(_)
            | RelayError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            RelayError::MissingAuthHeader | RelayError::InvalidToken => StatusCode::UNAUTHORIZED,

            // 502 Bad Gateway
            RelayError::Http(_) | RelayError::ProxyListParse(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            RelayError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            RelayError::Database(_) | RelayError::Io(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::ProxyListParse(err.to_string())
    }
}
