//! Login delegation to the external identity service.
//!
//! The service does not hold user credentials itself. A login request is
//! forwarded in two steps: obtain an initial service token, then log the
//! user in with it. The identity payload is returned verbatim on
//! success; every failure normalizes to an authentication error so the
//! boundary maps it to 401.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::errors::ServiceError;

#[derive(Debug, Deserialize)]
struct ServiceTokenResponse {
    token: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct IdentityService {
    http: reqwest::Client,
    base_url: String,
    service_username: String,
    service_password: String,
}

impl IdentityService {
    pub fn new(http: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            http,
            base_url: config.identity_url.trim_end_matches('/').to_string(),
            service_username: config.identity_username.clone(),
            service_password: config.identity_password.clone(),
        }
    }

    /// Forwards a credential check and returns the identity payload
    /// verbatim.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<serde_json::Value, ServiceError> {
        let token = self.obtain_service_token().await?;

        let response = self
            .http
            .post(format!("{}/v2/auth/login", self.base_url))
            .header("Accept", "application/json")
            .header("Authorization", token)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Identity service unreachable during login");
                ServiceError::AuthError(format!("Identity service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Login failed");
            return Err(ServiceError::AuthError(format!(
                "{message} (HTTP {status})"
            )));
        }

        let payload: serde_json::Value = response.json().await.map_err(|e| {
            ServiceError::AuthError(format!("Malformed identity response: {e}"))
        })?;

        info!("Login succeeded");
        Ok(payload)
    }

    async fn obtain_service_token(&self) -> Result<String, ServiceError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/token", self.base_url))
            .header("Accept", "application/json")
            .json(&json!({
                "username": self.service_username,
                "password": self.service_password,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::AuthError(format!("Identity token request failed: {e}")))?;

        let status = response.status();
        let payload: ServiceTokenResponse = response.json().await.map_err(|e| {
            ServiceError::AuthError(format!("Malformed identity token response: {e}"))
        })?;

        if !status.is_success() {
            return Err(ServiceError::AuthError(format!(
                "Identity token request rejected (HTTP {status}): {}",
                payload.message.unwrap_or_default()
            )));
        }

        payload.token.ok_or_else(|| {
            ServiceError::AuthError("Identity token response did not contain a token".to_string())
        })
    }
}
