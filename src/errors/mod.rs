//! Error handling module for the kids activities backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const AUTHENTICATION_ERROR: &str = "AUTHENTICATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const STORE_READ_ERROR: &str = "STORE_READ_ERROR";
    pub const STORE_WRITE_ERROR: &str = "STORE_WRITE_ERROR";
    pub const NORMALIZATION_ERROR: &str = "NORMALIZATION_ERROR";
    pub const TEMPLATE_ERROR: &str = "TEMPLATE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const SESSION_PENDING: &str = "SESSION_PENDING";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// No signed-in user for a protected route
    Unauthorized(String),
    /// Sign-in rejected by the identity provider
    Authentication(String),
    /// Resource not found
    NotFound(String),
    /// Validation error
    Validation(String),
    /// Document store read failed
    StoreRead(String),
    /// Document store write failed
    StoreWrite(String),
    /// Image URL could not be unwrapped
    Normalization(String),
    /// Page rendering failed
    Template(String),
    /// Session state not resolved yet
    SessionPending,
    /// Internal server error
    Internal(String),
    /// Bad request
    BadRequest(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::StoreRead(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::StoreWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Normalization(_) => StatusCode::BAD_REQUEST,
            AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SessionPending => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::Authentication(_) => codes::AUTHENTICATION_ERROR,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::StoreRead(_) => codes::STORE_READ_ERROR,
            AppError::StoreWrite(_) => codes::STORE_WRITE_ERROR,
            AppError::Normalization(_) => codes::NORMALIZATION_ERROR,
            AppError::Template(_) => codes::TEMPLATE_ERROR,
            AppError::SessionPending => codes::SESSION_PENDING,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
            AppError::BadRequest(_) => codes::BAD_REQUEST,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::Authentication(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::StoreRead(msg) => msg.clone(),
            AppError::StoreWrite(msg) => msg.clone(),
            AppError::Normalization(msg) => msg.clone(),
            AppError::Template(msg) => msg.clone(),
            AppError::SessionPending => "Session is still loading".to_string(),
            AppError::Internal(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
        }
    }

    /// Wrap a failed store read.
    pub fn store_read(err: sqlx::Error) -> Self {
        tracing::error!("Store read error: {:?}", err);
        AppError::StoreRead(format!("Store read error: {}", err))
    }

    /// Wrap a failed store write.
    pub fn store_write(err: sqlx::Error) -> Self {
        tracing::error!("Store write error: {:?}", err);
        AppError::StoreWrite(format!("Store write error: {}", err))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest(format!("JSON error: {}", err))
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        tracing::error!("Template error: {:?}", err);
        AppError::Template(format!("Template error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
