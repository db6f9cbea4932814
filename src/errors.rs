use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Standard error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Machine-readable error code (e.g., "DUPLICATE_PROVIDER_SALE_ID")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Public id of the conflicting Sale, present on duplicate-sale errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A Sale with the same provider id already exists. Carries the
    /// existing Sale's public (secure) id for the 409 response body.
    #[error("A sale already exists for provider id {id_sale_provider}")]
    DuplicateSale {
        id_sale_provider: String,
        secure_id: String,
    },

    /// Mutation attempted against a Sale in a terminal status.
    #[error("Sale cannot be modified in status {0}")]
    InvalidStatus(String),

    #[error("Invalid time format: {0} (expected HH:MM:SS)")]
    InvalidTimeFormat(String),

    /// Cancelling more passengers than the Sale currently holds.
    #[error("Invalid passenger operation: {0}")]
    InvalidPaxOperation(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Remote tour-provider error family. Distinct kinds so callers can
    /// tell a missing tour from an unreachable endpoint.
    #[error("Tour not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider internal error: {0}")]
    ProviderInternal(String),

    #[error("No response from provider: {0}")]
    ProviderUnreachable(String),

    /// Remote 400 payload, normalized to one field-keyed message.
    #[error("Provider rejected the request: {0}")]
    ProviderValidation(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_)
            | Self::InvalidStatus(_)
            | Self::InvalidTimeFormat(_)
            | Self::InvalidPaxOperation(_)
            | Self::ProviderValidation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateSale { .. } => StatusCode::CONFLICT,
            Self::AuthError(_) | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::ProviderInternal(_) | Self::ProviderUnreachable(_) | Self::ProviderError(_) => {
                StatusCode::BAD_GATEWAY
            }
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "SALE_NOT_FOUND",
            Self::DuplicateSale { .. } => "DUPLICATE_PROVIDER_SALE_ID",
            Self::InvalidStatus(_) => "INVALID_SALE_STATUS",
            Self::InvalidTimeFormat(_) => "INVALID_TIME_FORMAT",
            Self::InvalidPaxOperation(_) => "INVALID_PAX_OPERATION",
            Self::AuthError(_) | Self::Unauthorized(_) => "AUTH_ERROR",
            Self::ProviderNotFound(_) => "TOUR_NOT_FOUND",
            Self::ProviderInternal(_) => "PROVIDER_INTERNAL_ERROR",
            Self::ProviderUnreachable(_) => "PROVIDER_UNREACHABLE",
            Self::ProviderValidation(_) => "PROVIDER_VALIDATION_ERROR",
            Self::ProviderError(_) => "PROVIDER_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Message suitable for HTTP responses. Internal errors return generic
    /// text so implementation details never leak to callers.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::RateLimitExceeded => "Rate limit exceeded".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let sale_id = match &self {
            ServiceError::DuplicateSale { secure_id, .. } => Some(secure_id.clone()),
            _ => None,
        };

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            code: Some(self.error_code().to_string()),
            sale_id,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
