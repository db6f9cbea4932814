//! HTTP Basic authentication for the sales endpoints.
//!
//! A single configured username/password pair guards every mutating
//! route. The comparison runs against config state injected through the
//! router; failures map to 401 with a machine-readable code.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::warn;

use crate::errors::ServiceError;

/// Credentials the middleware checks against, cloned out of `AppConfig`
/// at router construction.
#[derive(Debug, Clone)]
pub struct BasicAuthCredentials {
    pub username: String,
    pub password: String,
}

/// Authenticated principal inserted into request extensions on success.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
}

fn decode_credentials(header: &str) -> Result<(String, String), ServiceError> {
    let encoded = header
        .strip_prefix("Basic ")
        .ok_or_else(|| ServiceError::Unauthorized("Invalid authentication format".to_string()))?;

    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| ServiceError::Unauthorized("Malformed basic auth credentials".to_string()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| ServiceError::Unauthorized("Malformed basic auth credentials".to_string()))?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| ServiceError::Unauthorized("Malformed basic auth credentials".to_string()))?;

    Ok((username.to_string(), password.to_string()))
}

pub async fn basic_auth_middleware(
    State(credentials): State<BasicAuthCredentials>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let header = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".to_string()))?;

    let (username, password) = decode_credentials(header)?;

    if username != credentials.username || password != credentials.password {
        warn!(%username, "Rejected basic auth attempt");
        return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser { username });

    Ok(next.run(request).await)
}
