//! Client-credentials token cache for the OzyTrip identity endpoint.
//!
//! One cache per process, injected into the gateway. A cached token is
//! reused while `now` is at least [`EXPIRY_MARGIN`] short of its expiry;
//! concurrent refreshes are last-write-wins (the grant is idempotent at
//! the provider).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::config::OzyTripConfig;
use crate::errors::ServiceError;

/// Safety margin, in seconds, subtracted from the remote expiry.
const EXPIRY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Process-wide bearer-token cache for OzyTrip.
pub struct OzyTripTokenCache {
    http: reqwest::Client,
    config: OzyTripConfig,
    state: RwLock<Option<CachedToken>>,
}

impl OzyTripTokenCache {
    pub fn new(http: reqwest::Client, config: OzyTripConfig) -> Self {
        Self {
            http,
            config,
            state: RwLock::new(None),
        }
    }

    /// Returns a valid bearer token, refreshing it when the cached one is
    /// missing or inside the expiry margin.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> Result<String, ServiceError> {
        let now = Utc::now();

        if let Some(cached) = self.state.read().await.as_ref() {
            if cached.is_fresh(now) {
                debug!(expires_at = %cached.expires_at, "Reusing cached OzyTrip token");
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let token = fresh.token.clone();
        *self.state.write().await = Some(fresh);
        Ok(token)
    }

    async fn request_token(&self) -> Result<CachedToken, ServiceError> {
        let basic = BASE64.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ));
        let body = format!(
            "grant_type=client_credentials&scope={}",
            self.config.scope
        );

        let response = self
            .http
            .post(&self.config.token_url)
            .header("Authorization", format!("Basic {basic}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                ServiceError::AuthError(format!("OzyTrip token endpoint unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::AuthError(format!(
                "OzyTrip token request rejected (HTTP {status}): {detail}"
            )));
        }

        let payload: TokenResponse = response.json().await.map_err(|e| {
            ServiceError::AuthError(format!("Malformed OzyTrip token response: {e}"))
        })?;

        let token = payload.access_token.ok_or_else(|| {
            ServiceError::AuthError("OzyTrip token response did not contain a token".to_string())
        })?;

        let expires_at = Utc::now() + Duration::seconds(payload.expires_in);
        info!(%expires_at, "Obtained new OzyTrip token");

        Ok(CachedToken { token, expires_at })
    }
}
