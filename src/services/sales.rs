//! Sale creation saga.
//!
//! Creating a Sale walks an ordered list of fallible steps against the
//! tour provider, then persists the outcome locally in one transaction:
//!
//!   duplicate check -> tour information -> availability gate ->
//!   addToCart -> addPassengers -> rater -> pay -> persist
//!
//! Each remote step produces a tagged outcome; the orchestrator inspects
//! the failed stage to decide between aborting the request and persisting
//! a degraded Sale. The policy is deliberate and must hold exactly:
//!
//! * availability/quota/cart failures abort with a client error and no
//!   Sale is created;
//! * tour-information failures degrade: the Sale is still persisted in
//!   PROCESSING with the error embedded in the provider snapshot;
//! * once a booking id exists, downstream failures (passengers, rater,
//!   pay) degrade to a PARTIAL_SUCCESS snapshot - the remote cart is NOT
//!   rolled back;
//! * a passenger-step failure with no booking id propagates unchanged.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::entities::cart_item::{
    ActiveModel as CartItemActiveModel, CartItemStatus, Model as CartItemModel,
};
use crate::entities::sale::{ActiveModel as SaleActiveModel, Model as SaleModel, SaleStatus};
use crate::errors::ServiceError;
use crate::repositories::SaleRepository;
use crate::services::availability;
use crate::services::identifiers::IdentifierService;
use crate::services::ozytrip::types::{
    AgeGroup, CartRequest, CartResult, PassengersRequest, PayRequest, PayResult, TourInfo,
};
use crate::services::ozytrip::{TourProviderApi, DEFAULT_CURRENCY};
use crate::services::validation::{parse_service_date, validate_time_hms};

/// Payment method code sent to the provider (W = Webpay).
const DEFAULT_PAYMENT_METHOD: &str = "W";
const DEFAULT_AGE_GROUP: &str = "ADT";

/// Creation request, flattened from the REST body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSaleCommand {
    #[validate(length(min = 1, message = "Provider name is required"))]
    pub provider_name: String,
    #[validate(length(min = 1, message = "Provider sale id is required"))]
    pub id_sale_provider: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub phone_number: String,
    #[validate(length(min = 2, max = 2, message = "Country must be a 2-letter code"))]
    pub country: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub language: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
    #[validate(range(min = 1))]
    pub qty_pax: i32,
    #[validate(length(min = 1))]
    pub opt: String,
    pub total: Decimal,
    #[validate(length(min = 1, message = "At least one cart item is required"))]
    pub items: Vec<String>,
}

/// Sale payload exposed to clients: the secure id stands in for the
/// internal primary key, which never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct SaleResponse {
    pub id: String,
    pub id_sale_provider: String,
    pub provider_name: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    pub city: String,
    pub language: String,
    pub date: NaiveDate,
    pub time: String,
    pub qty_pax: i32,
    pub opt: String,
    pub total: Decimal,
    pub status: String,
    pub cancel_reason: Option<String>,
    pub ozytrip_booking_id: Option<String>,
    pub ozytrip_sales_code: Option<String>,
    pub cart_items: Vec<CartItemResponse>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartItemResponse {
    pub id_item_ecommerce: String,
    pub status: String,
    pub cancel_reason: Option<String>,
}

impl SaleResponse {
    pub fn from_model(sale: SaleModel, items: Vec<CartItemModel>) -> Self {
        Self {
            id: sale.secure_id,
            id_sale_provider: sale.id_sale_provider,
            provider_name: sale.provider_name,
            name: sale.name,
            last_name: sale.last_name,
            email: sale.email,
            phone_number: sale.phone_number,
            country: sale.country,
            city: sale.city,
            language: sale.language,
            date: sale.service_date,
            time: sale.service_time,
            qty_pax: sale.qty_pax,
            opt: sale.opt,
            total: sale.total,
            status: sale.status,
            cancel_reason: sale.cancel_reason,
            ozytrip_booking_id: sale.ozytrip_booking_id,
            ozytrip_sales_code: sale.ozytrip_sales_code,
            cart_items: items
                .into_iter()
                .map(|item| CartItemResponse {
                    id_item_ecommerce: item.id_item_ecommerce,
                    status: item.status,
                    cancel_reason: item.cancel_reason,
                })
                .collect(),
            created_at: sale.created_at,
            updated_at: sale.updated_at,
        }
    }
}

/// Stage tags for the remote portion of the saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStage {
    TourInformation,
    Availability,
    CartAdd,
    PassengersAdd,
    Rater,
    Payment,
}

impl SagaStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TourInformation => "TOUR_INFORMATION",
            Self::Availability => "AVAILABILITY",
            Self::CartAdd => "CART_ADD",
            Self::PassengersAdd => "PASSENGERS_ADD",
            Self::Rater => "RATER",
            Self::Payment => "PAYMENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotStatus {
    Success,
    PartialSuccess,
    Error,
}

/// Trimmed tour subset embedded in the persisted snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourSummary {
    pub tour_code: String,
    pub tour_name: String,
    pub start_time: Option<String>,
}

impl From<&TourInfo> for TourSummary {
    fn from(tour: &TourInfo) -> Self {
        Self {
            tour_code: tour.tour_code.clone(),
            tour_name: tour.tour_name.clone(),
            start_time: tour.start_time.clone(),
        }
    }
}

/// Compact audit record of the provider interaction, serialized into the
/// Sale row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    pub status: SnapshotStatus,
    pub timestamp: chrono::DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tour: Option<TourSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart: Option<CartResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PayResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Accumulated result of the remote steps. `failure` carries the first
/// failed stage when the saga decided to degrade instead of abort.
struct RemoteOutcome {
    tour: Option<TourInfo>,
    cart: Option<CartResult>,
    payment: Option<PayResult>,
    failure: Option<(SagaStage, String)>,
}

/// True when a remote failure must abort the request as a client error:
/// the availability gate and the cart step report in these terms.
fn is_client_gate_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("availability") || lower.contains("quota") || lower.contains("cart")
}

/// Re-tags a gate failure so it maps to a 400 even when the underlying
/// kind would not.
fn client_abort(err: ServiceError) -> ServiceError {
    if err.status_code() == http::StatusCode::BAD_REQUEST {
        err
    } else {
        ServiceError::ValidationError(err.to_string())
    }
}

#[derive(Clone)]
pub struct SaleService {
    repository: Arc<SaleRepository>,
    provider: Arc<dyn TourProviderApi>,
    identifiers: IdentifierService,
}

impl SaleService {
    pub fn new(
        repository: Arc<SaleRepository>,
        provider: Arc<dyn TourProviderApi>,
        identifiers: IdentifierService,
    ) -> Self {
        Self {
            repository,
            provider,
            identifiers,
        }
    }

    /// Runs the full creation saga.
    #[instrument(skip(self, command), fields(id_sale_provider = %command.id_sale_provider))]
    pub async fn create_sale(
        &self,
        command: CreateSaleCommand,
    ) -> Result<SaleResponse, ServiceError> {
        command.validate()?;
        validate_time_hms(&command.time)?;
        let service_date = parse_service_date(&command.date)?;
        if command.total < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Total must not be negative".to_string(),
            ));
        }

        // Idempotency precondition, checked before any remote call.
        if let Some(existing) = self
            .repository
            .find_by_provider_id(&command.id_sale_provider)
            .await?
        {
            return Err(ServiceError::DuplicateSale {
                id_sale_provider: existing.id_sale_provider,
                secure_id: existing.secure_id,
            });
        }

        let outcome = self.run_remote_steps(&command).await?;

        self.persist(&command, service_date, outcome).await
    }

    pub async fn get_sale(&self, id: &str) -> Result<SaleResponse, ServiceError> {
        let sale = self
            .repository
            .find_by_any_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {id} not found")))?;
        let items = self.repository.items_for(sale.id).await?;
        Ok(SaleResponse::from_model(sale, items))
    }

    /// The remote portion of the saga: tour -> availability -> cart ->
    /// passengers -> rater -> pay. Returns Err only when the request must
    /// fail without creating a Sale.
    async fn run_remote_steps(
        &self,
        command: &CreateSaleCommand,
    ) -> Result<RemoteOutcome, ServiceError> {
        let tour_code = &command.items[0];

        let tour = match self
            .provider
            .get_tour_information(tour_code, &command.date, 1, Some(DEFAULT_CURRENCY))
            .await
        {
            Ok(tour) => tour,
            Err(err) => {
                let message = err.to_string();
                if is_client_gate_error(&message) {
                    return Err(client_abort(err));
                }
                // Best-effort remote failure before the gate: local
                // bookkeeping still proceeds, with the error embedded.
                warn!(%message, "Tour information failed; persisting degraded sale");
                return Ok(RemoteOutcome {
                    tour: None,
                    cart: None,
                    payment: None,
                    failure: Some((SagaStage::TourInformation, message)),
                });
            }
        };

        // Availability gate: any failure here aborts before any remote
        // mutation, as a client error.
        let requested_pax = availability::check_availability(
            &tour,
            &command.date,
            &command.time,
            command.qty_pax.max(0) as u32,
        )
        .map_err(ServiceError::from)?;

        let cart_request = CartRequest {
            id_booking: None,
            tour_code: tour_code.clone(),
            service_date: format!("{}T{}", command.date, command.time),
            start_time: command.time.clone(),
            meeting_point_id: None,
            pickup_location_id: None,
            age_groups: build_age_groups(&tour, tour_code, requested_pax),
        };

        let cart = match self.provider.add_to_cart(cart_request).await {
            Ok(cart) => cart,
            Err(err) => {
                let message = err.to_string();
                if is_client_gate_error(&message) {
                    return Err(client_abort(err));
                }
                // No booking id was obtained: the original error
                // propagates.
                error!(%message, "addToCart failed before a booking id existed");
                return Err(err);
            }
        };

        if cart.id_booking.is_empty() {
            return Err(ServiceError::ProviderError(
                "addToCart returned no booking id".to_string(),
            ));
        }

        let passengers_request = PassengersRequest {
            id_booking: cart.id_booking.clone(),
            name: command.name.clone(),
            last_name: command.last_name.clone(),
            email: command.email.clone(),
            phone_number: command.phone_number.clone(),
            country: command.country.clone(),
            notification_type: "EMAIL".to_string(),
            anonymous_passengers: true,
            passengers: vec![],
            items_cart: vec![],
        };

        if let Err(err) = self.provider.add_passengers(passengers_request).await {
            // The remote cart is retained on purpose; see the module docs.
            warn!(error = %err, id_booking = %cart.id_booking, "addPassengers failed after cart creation");
            return Ok(RemoteOutcome {
                tour: Some(tour),
                cart: Some(cart),
                payment: None,
                failure: Some((SagaStage::PassengersAdd, err.to_string())),
            });
        }

        // The authoritative charge amount always comes from the rater,
        // never from the caller-supplied total.
        let rater = match self.provider.get_rater(&cart.id_booking).await {
            Ok(rater) => rater,
            Err(err) => {
                warn!(error = %err, id_booking = %cart.id_booking, "Rater query failed");
                return Ok(RemoteOutcome {
                    tour: Some(tour),
                    cart: Some(cart),
                    payment: None,
                    failure: Some((SagaStage::Rater, err.to_string())),
                });
            }
        };

        let pay_request = PayRequest {
            id_booking: cart.id_booking.clone(),
            total_amount: rater.total_amount,
            has_advance_payment: false,
            payment_date: Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            authorization_transaction_id: command.id_sale_provider.clone(),
            payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
            id_order_number: command.id_sale_provider.clone(),
            currency: DEFAULT_CURRENCY.to_string(),
            coupon_code: None,
            card_type: None,
            card_number: None,
        };

        match self.provider.pay(pay_request).await {
            Ok(payment) => Ok(RemoteOutcome {
                tour: Some(tour),
                cart: Some(cart),
                payment: Some(payment),
                failure: None,
            }),
            Err(err) => {
                warn!(error = %err, id_booking = %cart.id_booking, "Payment failed");
                Ok(RemoteOutcome {
                    tour: Some(tour),
                    cart: Some(cart),
                    payment: None,
                    failure: Some((SagaStage::Payment, err.to_string())),
                })
            }
        }
    }

    /// Persists the Sale and its CartItems in one transaction, embedding
    /// the provider snapshot.
    async fn persist(
        &self,
        command: &CreateSaleCommand,
        service_date: NaiveDate,
        outcome: RemoteOutcome,
    ) -> Result<SaleResponse, ServiceError> {
        let secure_id = self.identifiers.issue_secure_id(service_date).await?;

        let snapshot_status = match (&outcome.failure, &outcome.cart) {
            (None, _) => SnapshotStatus::Success,
            (Some(_), Some(_)) => SnapshotStatus::PartialSuccess,
            (Some(_), None) => SnapshotStatus::Error,
        };

        let snapshot = ProviderSnapshot {
            status: snapshot_status,
            timestamp: Utc::now(),
            tour: outcome.tour.as_ref().map(TourSummary::from),
            cart: outcome.cart.clone(),
            payment: outcome.payment.clone(),
            error: outcome
                .failure
                .as_ref()
                .map(|(stage, message)| format!("{}: {message}", stage.as_str())),
        };

        let status = if outcome.failure.is_none() && outcome.payment.is_some() {
            SaleStatus::Confirmed
        } else {
            SaleStatus::Processing
        };

        let sale_id = Uuid::new_v4();
        let now = Utc::now();

        let sale = SaleActiveModel {
            id: Set(sale_id),
            id_sale_provider: Set(command.id_sale_provider.clone()),
            secure_id: Set(secure_id),
            provider_name: Set(command.provider_name.clone()),
            name: Set(command.name.clone()),
            last_name: Set(command.last_name.clone()),
            email: Set(command.email.clone()),
            phone_number: Set(command.phone_number.clone()),
            country: Set(command.country.clone()),
            city: Set(command.city.clone()),
            language: Set(command.language.clone()),
            service_date: Set(service_date),
            service_time: Set(command.time.clone()),
            qty_pax: Set(command.qty_pax),
            opt: Set(command.opt.clone()),
            total: Set(command.total),
            ozytrip_booking_id: Set(outcome.cart.as_ref().map(|c| c.id_booking.clone())),
            ozytrip_sales_code: Set(outcome
                .payment
                .as_ref()
                .and_then(|p| p.sales_code.clone())),
            ozytrip_balance: Set(outcome.payment.as_ref().and_then(|p| p.balance)),
            ozytrip_has_advance_payment: Set(outcome
                .payment
                .as_ref()
                .and_then(|p| p.has_advance_payment)),
            ozytrip_response: Set(Some(serde_json::to_string(&snapshot).map_err(|e| {
                ServiceError::InternalError(format!("Could not serialize provider snapshot: {e}"))
            })?)),
            status: Set(status.to_string()),
            cancel_reason: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let items: Vec<CartItemActiveModel> = command
            .items
            .iter()
            .map(|id_item| CartItemActiveModel {
                id: Set(Uuid::new_v4()),
                sale_id: Set(sale_id),
                id_item_ecommerce: Set(id_item.clone()),
                status: Set(CartItemStatus::Active.to_string()),
                cancel_reason: Set(None),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            })
            .collect();

        let (sale_model, item_models) = self.repository.create_with_items(sale, items).await?;

        info!(
            secure_id = %sale_model.secure_id,
            status = %sale_model.status,
            snapshot = ?snapshot_status,
            "Sale persisted"
        );

        Ok(SaleResponse::from_model(sale_model, item_models))
    }
}

/// Builds the age-group breakdown for the cart from the tour's price
/// schedule; a single ADT group at full quantity when no schedule exists.
fn build_age_groups(tour: &TourInfo, id_item_ecommerce: &str, qty_pax: u32) -> Vec<AgeGroup> {
    let from_schedule: Vec<AgeGroup> = tour
        .price_headers
        .iter()
        .flat_map(|header| header.prices.iter())
        .filter_map(|price| {
            price.quantity.filter(|qty| *qty > 0).map(|qty| AgeGroup {
                id_item_ecommerce: id_item_ecommerce.to_string(),
                age_group_code: price.age_group_code.clone(),
                quantity: qty,
            })
        })
        .collect();

    if from_schedule.is_empty() {
        vec![AgeGroup {
            id_item_ecommerce: id_item_ecommerce.to_string(),
            age_group_code: DEFAULT_AGE_GROUP.to_string(),
            quantity: qty_pax,
        }]
    } else {
        from_schedule
    }
}
