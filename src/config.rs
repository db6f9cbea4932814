use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_LOGIN_ATTEMPTS: u32 = 5;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 300;

/// OzyTrip provider endpoints and client-credentials pair. The credential
/// pair differs per environment, so both live in config, not code.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OzyTripConfig {
    /// Token endpoint (client-credentials grant, HTTP Basic)
    pub token_url: String,

    /// Base URL of the booking API
    pub api_url: String,

    pub client_id: String,
    pub client_secret: String,

    /// OAuth2 scope requested with the token grant
    #[serde(default = "default_ozytrip_scope")]
    pub scope: String,
}

fn default_ozytrip_scope() -> String {
    "ozy_trip_ecommerce_api".to_string()
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback outside development
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Basic-auth credentials protecting the sales endpoints
    #[validate(length(min = 1))]
    pub basic_auth_username: String,
    #[validate(length(min = 8, message = "Basic auth password must be at least 8 characters"))]
    pub basic_auth_password: String,

    /// External identity service base URL (login delegation)
    pub identity_url: String,

    /// Service account used to obtain the identity service's initial token
    #[serde(default)]
    pub identity_username: String,
    #[serde(default)]
    pub identity_password: String,

    /// Login rate limiting: attempts per window
    #[serde(default = "default_login_attempts")]
    pub login_max_attempts: u32,
    /// Login rate limiting: window size (seconds)
    #[serde(default = "default_login_window_secs")]
    pub login_window_seconds: u64,

    /// OzyTrip provider configuration
    #[validate]
    pub ozytrip: OzyTripConfig,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_login_attempts() -> u32 {
    DEFAULT_LOGIN_ATTEMPTS
}
fn default_login_window_secs() -> u64 {
    DEFAULT_LOGIN_WINDOW_SECS
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Constraints that cut across fields and cannot be expressed as
    /// per-field validator attributes.
    pub fn validate_additional_constraints(&self) -> Result<(), String> {
        if !self.is_development()
            && self.cors_allowed_origins.is_none()
            && !self.cors_allow_any_origin
        {
            return Err(
                "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                    .to_string(),
            );
        }
        if self.ozytrip.client_id.is_empty() || self.ozytrip.client_secret.is_empty() {
            return Err("OzyTrip client credentials are not configured".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration load error: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Initializes the tracing subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter_directive =
        env::var("RUST_LOG").unwrap_or_else(|_| format!("toursales_api={log_level},info"));

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://toursales.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    // Fail early with a clear message when the basic-auth pair is missing;
    // the sales endpoints are unusable without it.
    if config.get_string("basic_auth_username").is_err()
        || config.get_string("basic_auth_password").is_err()
    {
        error!("Basic auth credentials are not configured. Set APP__BASIC_AUTH_USERNAME and APP__BASIC_AUTH_PASSWORD.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "basic_auth_username / basic_auth_password are required but not configured".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e.to_string())
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            host: "127.0.0.1".into(),
            port: 8080,
            environment: "production".into(),
            log_level: "info".into(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: 10,
            db_min_connections: 1,
            db_connect_timeout_secs: 30,
            db_idle_timeout_secs: 600,
            db_acquire_timeout_secs: 8,
            basic_auth_username: "svc".into(),
            basic_auth_password: "super-secret-pass".into(),
            identity_url: "https://usuarios.example.cl/api".into(),
            identity_username: "svc-template".into(),
            identity_password: "svc-password".into(),
            login_max_attempts: 5,
            login_window_seconds: 300,
            ozytrip: OzyTripConfig {
                token_url: "https://identity.example.cl/connect/token".into(),
                api_url: "https://api.example.cl".into(),
                client_id: "EcommerceClient".into(),
                client_secret: "secret".into(),
                scope: default_ozytrip_scope(),
            },
        }
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://ventas.example.cl".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_skips_cors_requirement() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
        assert!(cfg.should_allow_permissive_cors());
    }

    #[test]
    fn missing_provider_credentials_rejected() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        cfg.ozytrip.client_secret = String::new();
        assert!(cfg.validate_additional_constraints().is_err());
    }
}
