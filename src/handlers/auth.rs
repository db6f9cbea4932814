//! Login endpoint: delegates the credential check to the external
//! identity service and returns its payload verbatim. Failed attempts
//! are rate limited per account, independent of the sales core.

use axum::{extract::State, response::Json};
use serde::Deserialize;
use tracing::warn;

use crate::errors::ServiceError;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(ServiceError::ValidationError(
            "Email and password are required".to_string(),
        ));
    }

    let limiter = &state.services.login_limiter;
    if limiter.is_blocked(&request.email) {
        warn!(email = %request.email, "Login blocked by rate limiter");
        return Err(ServiceError::RateLimitExceeded);
    }

    match state
        .services
        .identity
        .login(&request.email, &request.password)
        .await
    {
        Ok(payload) => {
            limiter.reset(&request.email);
            Ok(Json(ApiResponse::success(payload)))
        }
        Err(err) => {
            let attempts = limiter.register_failure(&request.email);
            warn!(email = %request.email, attempts, "Login attempt failed");
            // Normalize every upstream failure to 401
            let message = match err {
                ServiceError::AuthError(msg) => msg,
                other => other.response_message(),
            };
            Err(ServiceError::AuthError(message))
        }
    }
}
