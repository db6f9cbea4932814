pub mod auth;
pub mod sales;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::rate_limiter::{LoginRateLimiter, RateLimitConfig};
use crate::repositories::SaleRepository;
use crate::services::identifiers::IdentifierService;
use crate::services::identity::IdentityService;
use crate::services::lifecycle::SaleLifecycleService;
use crate::services::ozytrip::{OzyTripClient, OzyTripTokenCache, TourProviderApi};
use crate::services::sales::SaleService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub sales: SaleService,
    pub lifecycle: SaleLifecycleService,
    pub identity: IdentityService,
    pub login_limiter: Arc<LoginRateLimiter>,
}

impl AppServices {
    /// Wires the production dependency graph: one HTTP client, one token
    /// cache, one provider gateway, shared by every request.
    pub fn new(db: Arc<DbPool>, config: &AppConfig) -> Self {
        let http = reqwest::Client::new();
        let tokens = Arc::new(OzyTripTokenCache::new(
            http.clone(),
            config.ozytrip.clone(),
        ));
        let provider: Arc<dyn TourProviderApi> = Arc::new(OzyTripClient::new(
            http.clone(),
            config.ozytrip.api_url.clone(),
            tokens,
        ));
        Self::with_provider(db, config, provider)
    }

    /// Same wiring with an injected provider; test suites substitute a
    /// scripted implementation here.
    pub fn with_provider(
        db: Arc<DbPool>,
        config: &AppConfig,
        provider: Arc<dyn TourProviderApi>,
    ) -> Self {
        let repository = Arc::new(SaleRepository::new(db.clone()));
        let identifiers = IdentifierService::new(db);
        let sales = SaleService::new(repository.clone(), provider, identifiers);
        let lifecycle = SaleLifecycleService::new(repository);
        let identity = IdentityService::new(reqwest::Client::new(), config);
        let login_limiter = Arc::new(LoginRateLimiter::new(RateLimitConfig {
            max_attempts: config.login_max_attempts,
            window: std::time::Duration::from_secs(config.login_window_seconds),
        }));

        Self {
            sales,
            lifecycle,
            identity,
            login_limiter,
        }
    }
}
