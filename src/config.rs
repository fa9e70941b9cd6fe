use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
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

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
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

    /// Whole-request timeout applied by the HTTP stack (seconds)
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    /// Default page size for paginated API responses
    #[serde(default = "default_api_page_size")]
    #[validate(range(min = 1))]
    pub api_default_page_size: u64,

    /// Maximum page size allowed for paginated API responses
    #[serde(default = "default_api_max_page_size")]
    #[validate(range(min = 1))]
    pub api_max_page_size: u64,

    /// Stock at or below `reorder_level * ratio` is reported as critical
    #[serde(default = "default_stock_critical_ratio")]
    #[validate(custom = "validate_ratio")]
    pub stock_critical_ratio: f64,

    /// Stock above `reorder_level * ratio` is reported as excess
    #[serde(default = "default_stock_excess_ratio")]
    #[validate(custom = "validate_ratio")]
    pub stock_excess_ratio: f64,

    /// Window used by usage-trend and turnover reports when none is requested
    #[serde(default = "default_usage_trend_days")]
    #[validate(range(min = 1, max = 366))]
    pub usage_trend_default_days: u32,
}

impl AppConfig {
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            stock_critical_ratio: default_stock_critical_ratio(),
            stock_excess_ratio: default_stock_excess_ratio(),
            usage_trend_default_days: default_usage_trend_days(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|origins| origins.split(',').any(|o| !o.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.cors_allow_any_origin || !self.is_production()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Ratios used to bucket material stock into critical/low/normal/excess.
    pub fn stock_thresholds(&self) -> crate::services::bom_calculator::StockThresholds {
        crate::services::bom_calculator::StockThresholds {
            critical_ratio: Decimal::try_from(self.stock_critical_ratio)
                .unwrap_or_else(|_| Decimal::new(5, 1)),
            excess_ratio: Decimal::try_from(self.stock_excess_ratio)
                .unwrap_or_else(|_| Decimal::from(3)),
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.api_default_page_size > self.api_max_page_size {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("api_default_page_size cannot exceed api_max_page_size".into());
            errors.add("api_default_page_size", err);
        }

        if self.stock_critical_ratio >= 1.0 || self.stock_excess_ratio <= 1.0 {
            let mut err = ValidationError::new("stock_ratios");
            err.message = Some(
                "stock_critical_ratio must be below 1.0 and stock_excess_ratio above 1.0".into(),
            );
            errors.add("stock_critical_ratio", err);
        }

        if self.is_production() && !self.has_cors_allowed_origins() && !self.cors_allow_any_origin
        {
            let mut err = ValidationError::new("cors_allowed_origins");
            err.message = Some(
                "Production requires cors_allowed_origins or cors_allow_any_origin=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
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

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_stock_critical_ratio() -> f64 {
    0.5
}

fn default_stock_excess_ratio() -> f64 {
    3.0
}

fn default_usage_trend_days() -> u32 {
    30
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_ratio(ratio: f64) -> Result<(), ValidationError> {
    if !ratio.is_finite() || ratio < 0.0 {
        let mut err = ValidationError::new("ratio");
        err.message = Some("stock ratios must be finite and non-negative".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("stockline_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

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
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit configuration directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://stockline.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env.clone())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
