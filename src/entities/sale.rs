use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a Sale. CANCELLED and REFUNDED are terminal:
/// no mutation is permitted once either is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SaleStatus {
    Processing,
    Confirmed,
    Cancelled,
    Refunded,
}

impl SaleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SaleStatus::Cancelled | SaleStatus::Refunded)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Caller-supplied sale id, globally unique and immutable.
    #[sea_orm(unique)]
    pub id_sale_provider: String,

    /// System-generated public identifier (TUR-YYYYMMDD-XXXX), exposed
    /// externally in place of the internal primary key.
    #[sea_orm(unique)]
    pub secure_id: String,

    pub provider_name: String,

    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub phone_number: String,
    #[validate(length(min = 2, max = 2, message = "Country must be a 2-letter code"))]
    pub country: String,
    pub city: String,
    pub language: String,

    pub service_date: NaiveDate,
    /// Service time as HH:MM:SS, validated before every write.
    pub service_time: String,

    #[validate(range(min = 1))]
    pub qty_pax: i32,
    pub opt: String,
    pub total: Decimal,

    pub ozytrip_booking_id: Option<String>,
    pub ozytrip_sales_code: Option<String>,
    pub ozytrip_balance: Option<Decimal>,
    pub ozytrip_has_advance_payment: Option<bool>,
    /// Serialized snapshot of the last OzyTrip interaction (status,
    /// timestamp, trimmed tour info, cart/payment response, error).
    #[sea_orm(column_type = "Text", nullable)]
    pub ozytrip_response: Option<String>,

    pub status: String,
    pub cancel_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn sale_status(&self) -> SaleStatus {
        self.status
            .parse()
            .unwrap_or(SaleStatus::Processing)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItem,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }

        if let ActiveValue::NotSet = active_model.updated_at {
            active_model.updated_at = Set(Some(now));
        }

        Ok(active_model)
    }
}
