//! Post-creation Sale mutations: customer-detail updates, partial
//! passenger cancellation, and full-sale cancellation.
//!
//! Every operation is status-gated: a Sale in CANCELLED or REFUNDED is
//! frozen and rejects mutation. Item/parent updates run inside one
//! transaction so a crash cannot leave a half-cancelled Sale.

use sea_orm::{IntoActiveModel, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::entities::cart_item::{CartItemStatus, Model as CartItemModel};
use crate::entities::sale::{Model as SaleModel, SaleStatus};
use crate::errors::ServiceError;
use crate::repositories::SaleRepository;
use crate::services::sales::SaleResponse;
use crate::services::validation::{parse_service_date, validate_time_hms};

const PARTIAL_CANCEL_ITEM_REASON: &str = "Partial passenger cancellation";
const TOTAL_PAX_CANCEL_REASON: &str = "All passengers cancelled";
const ALL_ITEMS_CANCELLED_REASON: &str = "All cart items have been cancelled";
const FULL_CANCEL_ITEM_PREFIX: &str = "Full sale cancellation. Reason:";
const FULL_CANCEL_DEFAULT_REASON: &str = "No reason specified";

/// Mutable customer fields. Everything else on a Sale is immutable after
/// creation.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSaleCommand {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub phone_number: Option<String>,
    #[validate(length(min = 2, max = 2, message = "Country must be a 2-letter code"))]
    pub country: Option<String>,
    #[validate(length(min = 1))]
    pub city: Option<String>,
    #[validate(length(min = 1))]
    pub language: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    /// `HH:MM:SS`
    pub time: Option<String>,
}

#[derive(Clone)]
pub struct SaleLifecycleService {
    repository: Arc<SaleRepository>,
}

impl SaleLifecycleService {
    pub fn new(repository: Arc<SaleRepository>) -> Self {
        Self { repository }
    }

    async fn find_required(&self, id: &str) -> Result<SaleModel, ServiceError> {
        self.repository
            .find_by_any_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {id} not found")))
    }

    /// Rejects mutation of a terminal-state Sale.
    fn ensure_mutable(sale: &SaleModel) -> Result<(), ServiceError> {
        let status = sale.sale_status();
        if status.is_terminal() {
            return Err(ServiceError::InvalidStatus(status.to_string()));
        }
        Ok(())
    }

    /// Updates the mutable customer fields of a Sale.
    #[instrument(skip(self, command), fields(sale_id = %id))]
    pub async fn update_details(
        &self,
        id: &str,
        command: UpdateSaleCommand,
    ) -> Result<SaleResponse, ServiceError> {
        command.validate()?;

        let sale = self.find_required(id).await?;
        Self::ensure_mutable(&sale)?;

        let parsed_date = command
            .date
            .as_deref()
            .map(parse_service_date)
            .transpose()?;
        if let Some(time) = command.time.as_deref() {
            validate_time_hms(time)?;
        }

        let sale_id = sale.id;
        let mut active = sale.into_active_model();
        if let Some(name) = command.name {
            active.name = Set(name);
        }
        if let Some(last_name) = command.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = command.email {
            active.email = Set(email);
        }
        if let Some(phone_number) = command.phone_number {
            active.phone_number = Set(phone_number);
        }
        if let Some(country) = command.country {
            active.country = Set(country);
        }
        if let Some(city) = command.city {
            active.city = Set(city);
        }
        if let Some(language) = command.language {
            active.language = Set(language);
        }
        if let Some(date) = parsed_date {
            active.service_date = Set(date);
        }
        if let Some(time) = command.time {
            active.service_time = Set(time);
        }
        active.updated_at = Set(Some(chrono::Utc::now()));

        let updated = self.repository.update(active).await?;
        let items = self.repository.items_for(sale_id).await?;
        info!(secure_id = %updated.secure_id, "Sale details updated");
        Ok(SaleResponse::from_model(updated, items))
    }

    /// Cancels `qty_pax` passengers: the first N currently-ACTIVE items in
    /// order are cancelled and the Sale counter is decremented. Reaching
    /// zero cancels the whole Sale.
    #[instrument(skip(self), fields(sale_id = %id, qty_pax))]
    pub async fn cancel_partial(
        &self,
        id: &str,
        qty_pax: i32,
        reason: Option<String>,
    ) -> Result<SaleResponse, ServiceError> {
        if qty_pax < 1 {
            return Err(ServiceError::ValidationError(
                "The number of passengers to cancel must be a positive integer".to_string(),
            ));
        }

        let sale = self.find_required(id).await?;
        Self::ensure_mutable(&sale)?;

        if qty_pax > sale.qty_pax {
            return Err(ServiceError::InvalidPaxOperation(format!(
                "Cannot cancel more passengers than the sale holds ({} available)",
                sale.qty_pax
            )));
        }

        let items = self.repository.items_for(sale.id).await?;
        let active_items: Vec<&CartItemModel> =
            items.iter().filter(|item| item.is_active()).collect();

        let item_reason = reason
            .clone()
            .unwrap_or_else(|| PARTIAL_CANCEL_ITEM_REASON.to_string());

        // First-N by existing order, capped at however many are active.
        let to_cancel = active_items.len().min(qty_pax as usize);
        let item_mutations = active_items[..to_cancel]
            .iter()
            .map(|item| {
                let mut active = (*item).clone().into_active_model();
                active.status = Set(CartItemStatus::Cancelled.to_string());
                active.cancel_reason = Set(Some(item_reason.clone()));
                active.updated_at = Set(Some(chrono::Utc::now()));
                active
            })
            .collect();

        let new_qty_pax = sale.qty_pax - qty_pax;
        let sale_id = sale.id;
        let prior_status = sale.status.clone();
        let prior_cancel_reason = sale.cancel_reason.clone();

        let mut sale_active = sale.into_active_model();
        sale_active.qty_pax = Set(new_qty_pax);
        if new_qty_pax == 0 {
            sale_active.status = Set(SaleStatus::Cancelled.to_string());
            sale_active.cancel_reason = Set(Some(
                reason
                    .clone()
                    .unwrap_or_else(|| TOTAL_PAX_CANCEL_REASON.to_string()),
            ));
        } else {
            sale_active.status = Set(prior_status);
            sale_active.cancel_reason = Set(prior_cancel_reason);
        }
        sale_active.updated_at = Set(Some(chrono::Utc::now()));

        let mut updated = self
            .repository
            .transactional_update(sale_active, item_mutations)
            .await?;

        // Defensive double-check: if no ACTIVE item survived, the Sale is
        // cancelled even when the counter arithmetic disagreed.
        let remaining = self.repository.items_for(sale_id).await?;
        let still_active = remaining.iter().filter(|item| item.is_active()).count();
        if still_active == 0 && updated.sale_status() != SaleStatus::Cancelled {
            warn!(secure_id = %updated.secure_id, "No active items remain; force-cancelling sale");
            let mut force = updated.into_active_model();
            force.status = Set(SaleStatus::Cancelled.to_string());
            force.cancel_reason = Set(Some(
                reason.unwrap_or_else(|| ALL_ITEMS_CANCELLED_REASON.to_string()),
            ));
            force.updated_at = Set(Some(chrono::Utc::now()));
            updated = self.repository.update(force).await?;
        }

        info!(
            secure_id = %updated.secure_id,
            cancelled = qty_pax,
            remaining_pax = updated.qty_pax,
            "Passengers cancelled"
        );
        Ok(SaleResponse::from_model(updated, remaining))
    }

    /// Cancels the whole Sale: every ACTIVE item is cancelled and the
    /// Sale moves to CANCELLED, atomically.
    #[instrument(skip(self), fields(sale_id = %id))]
    pub async fn cancel_full(
        &self,
        id: &str,
        reason: Option<String>,
    ) -> Result<SaleResponse, ServiceError> {
        let sale = self.find_required(id).await?;
        Self::ensure_mutable(&sale)?;

        let items = self.repository.items_for(sale.id).await?;
        let item_reason = format!(
            "{FULL_CANCEL_ITEM_PREFIX} {}",
            reason.as_deref().unwrap_or(FULL_CANCEL_DEFAULT_REASON)
        );

        let item_mutations = items
            .iter()
            .filter(|item| item.is_active())
            .map(|item| {
                let mut active = item.clone().into_active_model();
                active.status = Set(CartItemStatus::Cancelled.to_string());
                active.cancel_reason = Set(Some(item_reason.clone()));
                active.updated_at = Set(Some(chrono::Utc::now()));
                active
            })
            .collect();

        let sale_id = sale.id;
        let mut sale_active = sale.into_active_model();
        sale_active.status = Set(SaleStatus::Cancelled.to_string());
        sale_active.cancel_reason = Set(Some(
            reason.unwrap_or_else(|| FULL_CANCEL_DEFAULT_REASON.to_string()),
        ));
        sale_active.updated_at = Set(Some(chrono::Utc::now()));

        let updated = self
            .repository
            .transactional_update(sale_active, item_mutations)
            .await?;

        let remaining = self.repository.items_for(sale_id).await?;
        info!(secure_id = %updated.secure_id, "Sale fully cancelled");
        Ok(SaleResponse::from_model(updated, remaining))
    }
}
