//! Shared harness for the integration suites: an in-memory SQLite
//! database with the full schema, and a scripted tour provider that
//! stands in for OzyTrip.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use toursales_api::errors::ServiceError;
use toursales_api::migrator::Migrator;
use toursales_api::repositories::SaleRepository;
use toursales_api::services::identifiers::IdentifierService;
use toursales_api::services::lifecycle::SaleLifecycleService;
use toursales_api::services::ozytrip::types::{
    CartRequest, CartResult, PassengersRequest, PassengersResult, PayRequest, PayResult, Quota,
    RaterResult, TourDate, TourInfo,
};
use toursales_api::services::ozytrip::TourProviderApi;
use toursales_api::services::sales::{CreateSaleCommand, SaleService};

/// Fresh in-memory database with migrations applied. A single pooled
/// connection keeps every query on the same SQLite memory instance.
pub async fn test_db() -> Arc<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options)
        .await
        .expect("failed to open in-memory sqlite");
    Migrator::up(&db, None).await.expect("migrations failed");
    Arc::new(db)
}

/// Which step of the scripted provider should fail, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailAt {
    #[default]
    Nothing,
    TourInformation,
    CartAdd,
    PassengersAdd,
    Rater,
    Payment,
}

/// Deterministic stand-in for the remote provider. Records the order of
/// calls and fails at the configured step.
pub struct ScriptedProvider {
    pub tour: TourInfo,
    pub fail_at: FailAt,
    pub rater_amount: Decimal,
    pub calls: Mutex<Vec<&'static str>>,
}

impl ScriptedProvider {
    pub fn happy() -> Self {
        Self {
            tour: default_tour(),
            fail_at: FailAt::Nothing,
            rater_amount: dec!(50000),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            ..Self::happy()
        }
    }

    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

/// One date (2025-05-15) with one slot (14:00:00, 10 seats), no price
/// schedule.
pub fn default_tour() -> TourInfo {
    TourInfo {
        tour_code: "CITYTOUR".into(),
        tour_name: "City walking tour".into(),
        dates: vec![TourDate {
            date: "2025-05-15".into(),
            quotas: vec![Quota {
                start_time: "14:00:00".into(),
                end_time: "17:00:00".into(),
                available_quota: 10,
                is_available: true,
            }],
        }],
        ..Default::default()
    }
}

pub const BOOKING_ID: &str = "RV250515A0001";
pub const SALES_CODE: &str = "OZ-SC-0001";

#[async_trait]
impl TourProviderApi for ScriptedProvider {
    async fn get_tour_information(
        &self,
        _tour_code: &str,
        _date: &str,
        _number_days: u32,
        _currency: Option<&str>,
    ) -> Result<TourInfo, ServiceError> {
        self.record("tourInformation");
        if self.fail_at == FailAt::TourInformation {
            return Err(ServiceError::ProviderUnreachable(
                "simulated: no response from provider".into(),
            ));
        }
        Ok(self.tour.clone())
    }

    async fn add_to_cart(&self, _request: CartRequest) -> Result<CartResult, ServiceError> {
        self.record("addToCart");
        if self.fail_at == FailAt::CartAdd {
            return Err(ServiceError::ProviderValidation(
                "addToCart: serviceDate rejected".into(),
            ));
        }
        Ok(CartResult {
            id_booking: BOOKING_ID.into(),
            booking_expiration_date: Some("2025-05-15T14:30:00".into()),
            wait_time: Some(30),
        })
    }

    async fn add_passengers(
        &self,
        request: PassengersRequest,
    ) -> Result<PassengersResult, ServiceError> {
        self.record("addPassengers");
        if self.fail_at == FailAt::PassengersAdd {
            return Err(ServiceError::ProviderInternal(
                "simulated passenger registration failure".into(),
            ));
        }
        Ok(PassengersResult {
            id_booking: request.id_booking,
            status: Some("success".into()),
        })
    }

    async fn get_rater(&self, id_booking: &str) -> Result<RaterResult, ServiceError> {
        self.record("rater");
        if self.fail_at == FailAt::Rater {
            return Err(ServiceError::ProviderInternal(
                "simulated rater failure".into(),
            ));
        }
        Ok(RaterResult {
            id_booking: id_booking.to_string(),
            total_amount: self.rater_amount,
            currency: Some("CLP".into()),
        })
    }

    async fn pay(&self, request: PayRequest) -> Result<PayResult, ServiceError> {
        self.record("pay");
        if self.fail_at == FailAt::Payment {
            return Err(ServiceError::ProviderInternal(
                "simulated payment failure".into(),
            ));
        }
        Ok(PayResult {
            id_booking: request.id_booking,
            sales_code: Some(SALES_CODE.into()),
            balance: Some(dec!(0)),
            has_advance_payment: Some(false),
            status: Some("success".into()),
            payment_date: Some(request.payment_date),
            total_amount: Some(request.total_amount),
        })
    }
}

/// Full service wiring against a scripted provider.
pub struct TestServices {
    pub db: Arc<DatabaseConnection>,
    pub repository: Arc<SaleRepository>,
    pub sales: SaleService,
    pub lifecycle: SaleLifecycleService,
    pub provider: Arc<ScriptedProvider>,
}

pub async fn services_with(provider: ScriptedProvider) -> TestServices {
    let db = test_db().await;
    let repository = Arc::new(SaleRepository::new(db.clone()));
    let provider = Arc::new(provider);
    let sales = SaleService::new(
        repository.clone(),
        provider.clone(),
        IdentifierService::new(db.clone()),
    );
    let lifecycle = SaleLifecycleService::new(repository.clone());
    TestServices {
        db,
        repository,
        sales,
        lifecycle,
        provider,
    }
}

/// Minimal configuration for in-process HTTP tests.
pub fn test_config() -> toursales_api::config::AppConfig {
    toursales_api::config::AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 18080,
        environment: "test".into(),
        log_level: "info".into(),
        log_json: false,
        auto_migrate: false,
        cors_allowed_origins: None,
        cors_allow_any_origin: true,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 30,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 8,
        basic_auth_username: "svc".into(),
        basic_auth_password: "integration-pass".into(),
        identity_url: "http://127.0.0.1:1".into(),
        identity_username: "svc-template".into(),
        identity_password: "svc-password".into(),
        login_max_attempts: 5,
        login_window_seconds: 300,
        ozytrip: toursales_api::config::OzyTripConfig {
            token_url: "http://127.0.0.1:1/connect/token".into(),
            api_url: "http://127.0.0.1:1".into(),
            client_id: "EcommerceClient".into(),
            client_secret: "secret".into(),
            scope: "ozy_trip_ecommerce_api".into(),
        },
    }
}

/// Valid creation command for the default tour slot.
pub fn create_command(id_sale_provider: &str, qty_pax: i32) -> CreateSaleCommand {
    CreateSaleCommand {
        provider_name: "ecommerce-web".into(),
        id_sale_provider: id_sale_provider.into(),
        name: "Ana".into(),
        last_name: "Reyes".into(),
        email: "ana@example.com".into(),
        phone_number: "+56912345678".into(),
        country: "CL".into(),
        city: "Santiago".into(),
        language: "es".into(),
        date: "2025-05-15".into(),
        time: "14:00:00".into(),
        qty_pax,
        opt: "classic".into(),
        total: dec!(50000),
        items: (0..qty_pax.max(1))
            .map(|n| format!("b2f9a8d0-0000-0000-0000-00000000000{n}"))
            .collect(),
    }
}
