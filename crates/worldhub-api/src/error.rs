//! Worldhub: API error types.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use worldhub_core::error::{DomainError, ErrorCategory};

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Status and stable code for a domain error. The code is derived from the
/// error's category plus the variant where clients need to tell them apart.
#[must_use]
pub fn classify(err: &DomainError) -> (StatusCode, &'static str) {
    let code = match err {
        DomainError::WorldNotFound(_) => "world_not_found",
        DomainError::InviteNotFound(_) => "invite_not_found",
        DomainError::KeywordNotFound(_) => "keyword_not_found",
        DomainError::InviteInvalid(_) => "invite_invalid",
        DomainError::MemberInvalid(_) => "member_invalid",
        DomainError::Permission(_) => "permission_denied",
        DomainError::OwnerImmutable { .. } => "owner_immutable",
        DomainError::Validation(_) => "validation_error",
        DomainError::Conflict(_) => "conflict",
        DomainError::Infrastructure(_) => "infrastructure_error",
    };
    let status = match err.category() {
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Permission => StatusCode::FORBIDDEN,
        ErrorCategory::Invalid => StatusCode::BAD_REQUEST,
        ErrorCategory::OwnerImmutable | ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, code)
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(DomainError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = classify(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
