//! Sales endpoints.
//!
//! The wire contract follows the upstream e-commerce integration,
//! including its `custommer` spelling and camelCase field names; the
//! handlers translate it into the service-layer commands.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::services::lifecycle::UpdateSaleCommand;
use crate::services::sales::{CreateSaleCommand, SaleResponse};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct ProviderSection {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemSection {
    pub id_item_ecommerce: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSection {
    pub id_sale_provider: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    pub city: String,
    pub idioma: String,
    pub date: String,
    pub time: String,
    pub qtypax: i32,
    pub opt: String,
    pub total: Decimal,
    pub items_cart: Vec<CartItemSection>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub provider: ProviderSection,
    pub custommer: CustomerSection,
}

impl From<CreateSaleRequest> for CreateSaleCommand {
    fn from(request: CreateSaleRequest) -> Self {
        let CreateSaleRequest { provider, custommer } = request;
        CreateSaleCommand {
            provider_name: provider.name,
            id_sale_provider: custommer.id_sale_provider,
            name: custommer.name,
            last_name: custommer.last_name,
            email: custommer.email,
            phone_number: custommer.phone_number,
            country: custommer.country,
            city: custommer.city,
            language: custommer.idioma,
            date: custommer.date,
            time: custommer.time,
            qty_pax: custommer.qtypax,
            opt: custommer.opt,
            total: custommer.total,
            items: custommer
                .items_cart
                .into_iter()
                .map(|item| item.id_item_ecommerce)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleRequest {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub idioma: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl From<UpdateSaleRequest> for UpdateSaleCommand {
    fn from(request: UpdateSaleRequest) -> Self {
        UpdateSaleCommand {
            name: request.name,
            last_name: request.last_name,
            email: request.email,
            phone_number: request.phone_number,
            country: request.country,
            city: request.city,
            language: request.idioma,
            date: request.date,
            time: request.time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaxRequest {
    pub qtypax: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelSaleRequest {
    pub reason: Option<String>,
}

/// POST /sales
pub async fn create_sale(
    State(state): State<AppState>,
    Json(request): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaleResponse>>), ServiceError> {
    let sale = state
        .services
        .sales
        .create_sale(CreateSaleCommand::from(request))
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(sale))))
}

/// GET /sales/{id} - `id` matches either the provider id or the secure id
pub async fn get_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let sale = state.services.sales.get_sale(&id).await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// PUT /sales/{id}
pub async fn update_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSaleRequest>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let sale = state
        .services
        .lifecycle
        .update_details(&id, UpdateSaleCommand::from(request))
        .await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// PUT /sales/{id}/pax - partial passenger cancellation
pub async fn update_pax(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePaxRequest>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let sale = state
        .services
        .lifecycle
        .cancel_partial(&id, request.qtypax, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(sale)))
}

/// POST /sales/{id}/cancel - full sale cancellation
pub async fn cancel_sale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CancelSaleRequest>,
) -> Result<Json<ApiResponse<SaleResponse>>, ServiceError> {
    let sale = state
        .services
        .lifecycle
        .cancel_full(&id, request.reason)
        .await?;
    Ok(Json(ApiResponse::success(sale)))
}
