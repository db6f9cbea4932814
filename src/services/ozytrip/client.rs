//! Typed client for the OzyTrip booking API.
//!
//! Each operation acquires a bearer token from the shared
//! [`OzyTripTokenCache`], validates its inputs before any network call,
//! and normalizes remote failures into the [`ServiceError`] provider
//! family so callers can distinguish a missing tour from an unreachable
//! endpoint.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::errors::ServiceError;

use super::token::OzyTripTokenCache;
use super::types::{
    CartRequest, CartResult, PassengersRequest, PassengersResult, PayRequest, PayResult,
    RaterResult, TourInfo,
};

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static DATETIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$").unwrap());
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d):([0-5]\d)$").unwrap());
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const MAX_NUMBER_DAYS: u32 = 150;
pub const DEFAULT_CURRENCY: &str = "CLP";

/// The four remote operations the sale saga depends on. Implemented by
/// [`OzyTripClient`]; test suites substitute their own implementation.
#[async_trait]
pub trait TourProviderApi: Send + Sync {
    async fn get_tour_information(
        &self,
        tour_code: &str,
        date: &str,
        number_days: u32,
        currency: Option<&str>,
    ) -> Result<TourInfo, ServiceError>;

    async fn add_to_cart(&self, request: CartRequest) -> Result<CartResult, ServiceError>;

    async fn add_passengers(
        &self,
        request: PassengersRequest,
    ) -> Result<PassengersResult, ServiceError>;

    async fn get_rater(&self, id_booking: &str) -> Result<RaterResult, ServiceError>;

    async fn pay(&self, request: PayRequest) -> Result<PayResult, ServiceError>;
}

pub struct OzyTripClient {
    http: reqwest::Client,
    api_url: String,
    tokens: Arc<OzyTripTokenCache>,
}

impl OzyTripClient {
    pub fn new(http: reqwest::Client, api_url: String, tokens: Arc<OzyTripTokenCache>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Normalizes a transport-level reqwest error. No HTTP status means
    /// the provider never answered.
    fn transport_error(context: &str, err: reqwest::Error) -> ServiceError {
        if err.is_connect() || err.is_timeout() || err.status().is_none() {
            ServiceError::ProviderUnreachable(format!("{context}: {err}"))
        } else {
            ServiceError::ProviderError(format!("{context}: {err}"))
        }
    }

    /// Maps a non-success response to the provider error family.
    async fn response_error(context: &str, response: reqwest::Response) -> ServiceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => {
                ServiceError::AuthError(format!("OzyTrip rejected the bearer token ({context})"))
            }
            StatusCode::NOT_FOUND => ServiceError::ProviderNotFound(context.to_string()),
            StatusCode::INTERNAL_SERVER_ERROR => {
                ServiceError::ProviderInternal(format!("{context}: {body}"))
            }
            StatusCode::BAD_REQUEST => {
                ServiceError::ProviderValidation(combine_validation_errors(context, &body))
            }
            _ => {
                let message = remote_message(&body).unwrap_or(body);
                ServiceError::ProviderError(format!("{context} (HTTP {status}): {message}"))
            }
        }
    }

    /// Parses a success body, substituting `fallback` when the remote
    /// legitimately returns an empty body.
    fn parse_or_default<T: serde::de::DeserializeOwned>(
        context: &str,
        body: &str,
        fallback: Option<T>,
    ) -> Result<T, ServiceError> {
        if body.trim().is_empty() {
            return fallback.ok_or_else(|| {
                ServiceError::ProviderError(format!("{context}: empty response body"))
            });
        }
        serde_json::from_str(body).map_err(|e| {
            ServiceError::ProviderError(format!("{context}: malformed response body: {e}"))
        })
    }
}

/// Extracts the remote `message` field from a JSON error body, if any.
fn remote_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

/// Joins a remote 400 payload into one field-keyed message. The remote
/// sends either `{"errors": {"field": ["msg", ...]}}` or `{"message": "..."}`.
fn combine_validation_errors(context: &str, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(errors) = value.get("errors").and_then(|e| e.as_object()) {
            let mut parts: Vec<String> = errors
                .iter()
                .map(|(field, messages)| {
                    let joined = match messages {
                        serde_json::Value::Array(list) => list
                            .iter()
                            .filter_map(|m| m.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                        other => other.to_string(),
                    };
                    format!("{field}: {joined}")
                })
                .collect();
            parts.sort();
            return format!("{context}: {}", parts.join("; "));
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return format!("{context}: {message}");
        }
    }
    format!("{context}: {body}")
}

fn validate_cart_request(request: &CartRequest) -> Result<(), ServiceError> {
    let mut missing = Vec::new();
    if request.tour_code.is_empty() {
        missing.push("tourCode");
    }
    if request.service_date.is_empty() {
        missing.push("serviceDate");
    }
    if request.start_time.is_empty() {
        missing.push("startTime");
    }
    if request.age_groups.is_empty() {
        missing.push("ageGroups");
    }
    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Missing required cart fields: {}",
            missing.join(", ")
        )));
    }

    if !DATETIME_RE.is_match(&request.service_date) {
        return Err(ServiceError::ValidationError(format!(
            "serviceDate must be yyyy-MM-ddThh:mm:ss, got {}",
            request.service_date
        )));
    }
    if !TIME_RE.is_match(&request.start_time) {
        return Err(ServiceError::ValidationError(format!(
            "startTime must be HH:mm:ss, got {}",
            request.start_time
        )));
    }

    // The time of day embedded in serviceDate must equal startTime exactly.
    let embedded = request.service_date.split('T').nth(1).unwrap_or_default();
    if embedded != request.start_time {
        return Err(ServiceError::ValidationError(format!(
            "serviceDate time ({embedded}) does not match startTime ({})",
            request.start_time
        )));
    }

    for (index, group) in request.age_groups.iter().enumerate() {
        let mut group_missing = Vec::new();
        if group.id_item_ecommerce.is_empty() {
            group_missing.push("idItemEcommerce");
        }
        if group.age_group_code.is_empty() {
            group_missing.push("ageGroupCode");
        }
        if !group_missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Age group {}: missing required fields: {}",
                index + 1,
                group_missing.join(", ")
            )));
        }
        if group.quantity == 0 {
            return Err(ServiceError::ValidationError(format!(
                "Age group {}: quantity must be greater than zero",
                index + 1
            )));
        }
    }

    Ok(())
}

fn validate_passengers_request(request: &PassengersRequest) -> Result<(), ServiceError> {
    let required = [
        ("idBooking", &request.id_booking),
        ("name", &request.name),
        ("lastName", &request.last_name),
        ("email", &request.email),
        ("phoneNumber", &request.phone_number),
        ("country", &request.country),
        ("notificationType", &request.notification_type),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| *field)
        .collect();
    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Missing required passenger fields: {}",
            missing.join(", ")
        )));
    }

    if !EMAIL_RE.is_match(&request.email) {
        return Err(ServiceError::ValidationError(format!(
            "Invalid email address: {}",
            request.email
        )));
    }

    if !matches!(request.notification_type.as_str(), "EMAIL" | "WHATSAPP") {
        return Err(ServiceError::ValidationError(
            "notificationType must be EMAIL or WHATSAPP".to_string(),
        ));
    }

    Ok(())
}

fn validate_pay_request(request: &PayRequest) -> Result<(), ServiceError> {
    let required = [
        ("idBooking", &request.id_booking),
        (
            "authorizationTransactionId",
            &request.authorization_transaction_id,
        ),
        ("paymentMethod", &request.payment_method),
        ("idOrderNumber", &request.id_order_number),
        ("paymentDate", &request.payment_date),
    ];
    let missing: Vec<&str> = required
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| *field)
        .collect();
    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Missing required payment fields: {}",
            missing.join(", ")
        )));
    }

    if !DATETIME_RE.is_match(&request.payment_date) {
        return Err(ServiceError::ValidationError(format!(
            "paymentDate must be yyyy-MM-ddThh:mm:ss, got {}",
            request.payment_date
        )));
    }

    if request.total_amount <= rust_decimal::Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "totalAmount must be a positive number".to_string(),
        ));
    }

    Ok(())
}

#[async_trait]
impl TourProviderApi for OzyTripClient {
    #[instrument(skip(self), fields(tour_code = %tour_code, date = %date))]
    async fn get_tour_information(
        &self,
        tour_code: &str,
        date: &str,
        number_days: u32,
        currency: Option<&str>,
    ) -> Result<TourInfo, ServiceError> {
        if tour_code.is_empty() {
            return Err(ServiceError::ValidationError(
                "Tour code is required".to_string(),
            ));
        }
        if !DATE_RE.is_match(date) {
            return Err(ServiceError::ValidationError(format!(
                "Date must be yyyy-mm-dd, got {date}"
            )));
        }
        if number_days < 1 || number_days > MAX_NUMBER_DAYS {
            return Err(ServiceError::ValidationError(format!(
                "Number of days must be between 1 and {MAX_NUMBER_DAYS}, got {number_days}"
            )));
        }

        let token = self.tokens.get_token().await?;
        let currency = currency.unwrap_or(DEFAULT_CURRENCY);
        let url = format!(
            "{}/api/v1/tourInformation/{tour_code}/{date}/{number_days}/{currency}",
            self.api_url
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Self::transport_error("tourInformation", e))?;

        if !response.status().is_success() {
            let err = Self::response_error(&format!("Tour {tour_code}"), response).await;
            error!(%err, tour_code, "tourInformation failed");
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error("tourInformation", e))?;
        let info: TourInfo = Self::parse_or_default("tourInformation", &body, None)?;
        info!(tour_code, dates = info.dates.len(), "Fetched tour information");
        Ok(info)
    }

    #[instrument(skip(self, request), fields(tour_code = %request.tour_code))]
    async fn add_to_cart(&self, request: CartRequest) -> Result<CartResult, ServiceError> {
        validate_cart_request(&request)?;

        let token = self.tokens.get_token().await?;
        let url = format!("{}/api/v1/addToCart", self.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_error("addToCart", e))?;

        if !response.status().is_success() {
            return Err(Self::response_error("addToCart", response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error("addToCart", e))?;
        let result: CartResult = Self::parse_or_default("addToCart", &body, None)?;
        info!(id_booking = %result.id_booking, "Cart item added");
        Ok(result)
    }

    #[instrument(skip(self, request), fields(id_booking = %request.id_booking))]
    async fn add_passengers(
        &self,
        request: PassengersRequest,
    ) -> Result<PassengersResult, ServiceError> {
        validate_passengers_request(&request)?;

        let token = self.tokens.get_token().await?;
        let url = format!("{}/api/v2/addPassengers", self.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_error("addPassengers", e))?;

        if !response.status().is_success() {
            return Err(Self::response_error("addPassengers", response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error("addPassengers", e))?;
        // The remote may answer 200 with no body; synthesize the minimal
        // success result in that case.
        let result = Self::parse_or_default(
            "addPassengers",
            &body,
            Some(PassengersResult {
                id_booking: request.id_booking.clone(),
                status: Some("success".to_string()),
            }),
        )?;
        info!(id_booking = %result.id_booking, "Passengers registered");
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_rater(&self, id_booking: &str) -> Result<RaterResult, ServiceError> {
        if id_booking.is_empty() {
            return Err(ServiceError::ValidationError(
                "Booking id is required".to_string(),
            ));
        }

        let token = self.tokens.get_token().await?;
        let url = format!("{}/api/v1/rater/{id_booking}", self.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Self::transport_error("rater", e))?;

        if !response.status().is_success() {
            return Err(Self::response_error("rater", response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error("rater", e))?;
        let result: RaterResult = Self::parse_or_default("rater", &body, None)?;
        info!(id_booking, total_amount = %result.total_amount, "Rater amount fetched");
        Ok(result)
    }

    #[instrument(skip(self, request), fields(id_booking = %request.id_booking))]
    async fn pay(&self, request: PayRequest) -> Result<PayResult, ServiceError> {
        validate_pay_request(&request)?;

        let token = self.tokens.get_token().await?;
        let url = format!("{}/api/v1/pay", self.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_error("pay", e))?;

        if !response.status().is_success() {
            return Err(Self::response_error("pay", response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error("pay", e))?;
        let result = Self::parse_or_default(
            "pay",
            &body,
            Some(PayResult {
                id_booking: request.id_booking.clone(),
                status: Some("success".to_string()),
                payment_date: Some(request.payment_date.clone()),
                total_amount: Some(request.total_amount),
                ..Default::default()
            }),
        )?;
        info!(id_booking = %result.id_booking, "Payment processed");
        Ok(result)
    }
}
