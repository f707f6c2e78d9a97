use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::IdentifierPair;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CLEANUP_INTERVAL: u64 = 300; // 5 minutes
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;
const DEFAULT_EXPIRATION_DAYS: u32 = 7;
const DEFAULT_API_TIMEOUT_SECS: u64 = 20;
const DEFAULT_STORE_NAME: &str = "Online Store";

/// Placeholder returned instead of the API token when settings are read back.
pub const REDACTED_SECRET: &str = "********";

/// Payment method settings, editable at runtime through the admin routes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_gateway_config", skip_on_field_errors = false))]
pub struct GatewayConfig {
    #[serde(default = "default_true_bool")]
    pub enabled: bool,

    #[serde(default = "default_title")]
    #[validate(length(min = 1, max = 120))]
    pub title: String,

    #[serde(default = "default_description")]
    #[validate(length(max = 1000))]
    pub description: String,

    /// Identifier issuance endpoint
    #[serde(default)]
    pub api_url: String,

    /// Sent as `Authorization: Token <api_token>`
    #[serde(default)]
    pub api_token: String,

    #[serde(default = "default_true_bool")]
    pub use_api: bool,

    #[serde(default)]
    pub backup_cvu: String,

    #[serde(default)]
    pub backup_alias: String,

    /// Days the shopper has to complete the transfer
    #[serde(default = "default_expiration_days")]
    #[validate(range(min = 1, max = 365))]
    pub expiration_days: u32,

    #[serde(default = "default_true_bool")]
    pub show_days: bool,

    /// Stored and exposed; nothing schedules it yet.
    #[serde(default)]
    pub enable_two_day_reminder: bool,

    #[serde(default = "default_api_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub api_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: default_title(),
            description: default_description(),
            api_url: String::new(),
            api_token: String::new(),
            use_api: true,
            backup_cvu: String::new(),
            backup_alias: String::new(),
            expiration_days: DEFAULT_EXPIRATION_DAYS,
            show_days: true,
            enable_two_day_reminder: false,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// The configured static pair, when both halves are set.
    pub fn backup_pair(&self) -> Option<IdentifierPair> {
        let pair = IdentifierPair::new(self.backup_cvu.trim(), self.backup_alias.trim());
        pair.is_complete().then_some(pair)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Copy safe to hand back to an administrator.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_token.is_empty() {
            copy.api_token = REDACTED_SECRET.to_string();
        }
        copy
    }

    /// Keeps the stored token when an edit echoes the redaction marker back.
    pub fn merge_secret_from(&mut self, current: &GatewayConfig) {
        if self.api_token == REDACTED_SECRET {
            self.api_token = current.api_token.clone();
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Seconds between expiration sweeps
    #[serde(default = "default_cleanup_interval")]
    #[validate(range(min = 1))]
    pub cleanup_interval_secs: u64,

    /// Shown in reminder emails
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Bearer token for the admin routes; admin routes reject everything when unset
    #[serde(default)]
    pub admin_token: Option<String>,

    /// HMAC secret for the payment confirmation webhook
    #[serde(default)]
    pub webhook_secret: Option<String>,

    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: u64,

    /// Accept unsigned payment confirmations. Off unless set explicitly.
    #[serde(default)]
    pub allow_unsigned_webhooks: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default)]
    #[validate]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for everything but the listener
    pub fn new(host: String, port: u16, environment: String) -> Self {
        Self {
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL,
            store_name: default_store_name(),
            admin_token: None,
            webhook_secret: None,
            webhook_tolerance_secs: DEFAULT_WEBHOOK_TOLERANCE_SECS,
            allow_unsigned_webhooks: false,
            cors_allowed_origins: None,
            gateway: GatewayConfig::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let has_secret = self
            .webhook_secret
            .as_deref()
            .is_some_and(|secret| !secret.trim().is_empty());
        if !has_secret && !self.allow_unsigned_webhooks {
            let mut err = ValidationError::new("webhook_secret_required");
            err.message = Some(
                "Set APP__WEBHOOK_SECRET or explicitly opt out via APP__ALLOW_UNSIGNED_WEBHOOKS=true"
                    .into(),
            );
            errors.add("webhook_secret", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cleanup_interval() -> u64 {
    DEFAULT_CLEANUP_INTERVAL
}

fn default_webhook_tolerance() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_title() -> String {
    "Bank transfer (CVU/Alias)".to_string()
}

fn default_description() -> String {
    "Pay by bank transfer to the CVU/Alias shown at checkout.".to_string()
}

fn default_expiration_days() -> u32 {
    DEFAULT_EXPIRATION_DAYS
}

fn default_api_timeout_secs() -> u64 {
    DEFAULT_API_TIMEOUT_SECS
}

/// Validates log level values
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

/// Backup-only mode needs a complete backup pair, and a set API URL must parse.
fn validate_gateway_config(config: &GatewayConfig) -> Result<(), ValidationError> {
    if !config.use_api && config.backup_pair().is_none() {
        let mut err = ValidationError::new("backup_pair_required");
        err.message = Some(
            "Backup CVU and backup alias are both required when the external API is disabled"
                .into(),
        );
        return Err(err);
    }

    let api_url = config.api_url.trim();
    if !api_url.is_empty() && url::Url::parse(api_url).is_err() {
        let mut err = ValidationError::new("api_url_invalid");
        err.message = Some("API URL must be an absolute http(s) URL".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("cvu_gateway={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
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

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!(
        use_api = app_config.gateway.use_api,
        has_backup = app_config.gateway.backup_pair().is_some(),
        "Configuration loaded successfully"
    );
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new("127.0.0.1".into(), 8080, "production".into())
    }

    #[test]
    fn backup_only_mode_requires_both_backup_fields() {
        let mut gateway = GatewayConfig {
            use_api: false,
            ..GatewayConfig::default()
        };
        assert!(gateway.validate().is_err());

        gateway.backup_cvu = "0000003100099999999999".into();
        assert!(gateway.validate().is_err());

        gateway.backup_alias = "tienda.respaldo".into();
        assert!(gateway.validate().is_ok());
    }

    #[test]
    fn api_mode_accepts_empty_backup() {
        let gateway = GatewayConfig {
            api_url: "https://cvu.example.com/issue".into(),
            ..GatewayConfig::default()
        };
        assert!(gateway.validate().is_ok());
        assert!(gateway.backup_pair().is_none());
    }

    #[test]
    fn malformed_api_url_is_rejected() {
        let gateway = GatewayConfig {
            api_url: "not a url".into(),
            ..GatewayConfig::default()
        };
        assert!(gateway.validate().is_err());
    }

    #[test]
    fn nested_gateway_errors_surface_on_app_config() {
        let mut cfg = base_config();
        cfg.gateway.use_api = false;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn webhook_secret_required_unless_opted_out() {
        let mut cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());

        cfg.allow_unsigned_webhooks = true;
        assert!(cfg.validate_additional_constraints().is_ok());

        cfg.allow_unsigned_webhooks = false;
        cfg.webhook_secret = Some("whsec_test".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn redaction_round_trip_keeps_stored_token() {
        let stored = GatewayConfig {
            api_token: "live-token".into(),
            ..GatewayConfig::default()
        };
        let mut edited = stored.redacted();
        assert_eq!(edited.api_token, REDACTED_SECRET);

        edited.title = "Transferencia".into();
        edited.merge_secret_from(&stored);
        assert_eq!(edited.api_token, "live-token");
    }
}
