//! Wire types for the OzyTrip booking API. Field names follow the remote
//! JSON contract (camelCase) and are renamed on (de)serialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tour availability and pricing, as returned by the tourInformation
/// endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TourInfo {
    pub tour_code: String,
    pub tour_name: String,
    pub start_time: Option<String>,
    pub encounter_type: Option<String>,
    pub encounter_type_description: Option<String>,
    pub use_intervals: bool,
    pub price_headers: Vec<PriceHeader>,
    pub dates: Vec<TourDate>,
    pub meeting_points: Vec<MeetingPoint>,
    pub pickup_locations: Vec<PickupLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PriceHeader {
    pub init_date: String,
    pub end_date: String,
    pub prices: Vec<Price>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Price {
    pub age_group: String,
    pub age_group_code: String,
    pub day_type_description: Option<String>,
    pub unit_price: Decimal,
    /// Configured quantity for this age group, when the price schedule
    /// carries one.
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TourDate {
    pub date: String,
    pub quotas: Vec<Quota>,
}

/// Remaining capacity for one start time on one date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quota {
    pub start_time: String,
    pub end_time: String,
    pub available_quota: u32,
    pub is_available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MeetingPoint {
    pub id: Option<i64>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PickupLocation {
    pub id: Option<String>,
    pub name: String,
}

/// One age-group line of an add-to-cart request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeGroup {
    pub id_item_ecommerce: String,
    pub age_group_code: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_booking: Option<String>,
    pub tour_code: String,
    /// `YYYY-MM-DDThh:mm:ss`; the embedded time must equal `start_time`.
    pub service_date: String,
    pub start_time: String,
    pub meeting_point_id: Option<i64>,
    pub pickup_location_id: Option<String>,
    pub age_groups: Vec<AgeGroup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartResult {
    pub id_booking: String,
    pub booking_expiration_date: Option<String>,
    pub wait_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengersRequest {
    pub id_booking: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub country: String,
    /// EMAIL or WHATSAPP
    pub notification_type: String,
    pub anonymous_passengers: bool,
    pub passengers: Vec<serde_json::Value>,
    pub items_cart: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassengersResult {
    pub id_booking: String,
    pub status: Option<String>,
}

/// Authoritative charge amount for a booking; the saga always pays the
/// rater's totalAmount, never the caller-supplied total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaterResult {
    pub id_booking: String,
    pub total_amount: Decimal,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRequest {
    pub id_booking: String,
    pub total_amount: Decimal,
    pub has_advance_payment: bool,
    /// `YYYY-MM-DDThh:mm:ss`
    pub payment_date: String,
    pub authorization_transaction_id: String,
    /// W: Webpay, T: wire transfer, etc.
    pub payment_method: String,
    pub id_order_number: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayResult {
    pub id_booking: String,
    pub sales_code: Option<String>,
    pub balance: Option<Decimal>,
    pub has_advance_payment: Option<bool>,
    pub status: Option<String>,
    pub payment_date: Option<String>,
    pub total_amount: Option<Decimal>,
}
