//! POS API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::str::FromStr;

use serde::Serialize;
use tavola_core::money::Rate;
use tavola_core::{DEFAULT_SERVICE_CHARGE_BPS, DEFAULT_TAX_RATE_BPS};
use tavola_orders::{CreationMode, EngineConfig, DEFAULT_EVENT_CAPACITY};

/// POS API configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for signing and verifying tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Tax rate in basis points (1000 = 10%)
    pub tax_rate_bps: u32,

    /// Service charge rate in basis points (500 = 5%)
    pub service_charge_bps: u32,

    /// Order creation strategy
    #[serde(serialize_with = "serialize_display")]
    pub creation_mode: CreationMode,

    /// Offset of the business day from UTC, in minutes
    pub business_utc_offset_minutes: i32,

    /// Capacity of the domain event channel
    pub event_channel_capacity: usize,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ApiConfig {
            http_port: parse_var("HTTP_PORT", 8080)?,

            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./tavola.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,

            // Must be set in production
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "tavola-dev-secret-change-in-production".to_string()),

            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", 3600)?,

            tax_rate_bps: parse_var("TAX_RATE_BPS", DEFAULT_TAX_RATE_BPS)?,

            service_charge_bps: parse_var("SERVICE_CHARGE_BPS", DEFAULT_SERVICE_CHARGE_BPS)?,

            creation_mode: parse_var("ORDER_CREATION_MODE", CreationMode::default())?,

            business_utc_offset_minutes: parse_var("BUSINESS_UTC_OFFSET_MINUTES", 0)?,

            event_channel_capacity: parse_var("EVENT_CHANNEL_CAPACITY", DEFAULT_EVENT_CAPACITY)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue("EVENT_CHANNEL_CAPACITY".to_string()));
        }
        // Offsets beyond ±14h do not exist
        if self.business_utc_offset_minutes.abs() > 14 * 60 {
            return Err(ConfigError::InvalidValue("BUSINESS_UTC_OFFSET_MINUTES".to_string()));
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new()
            .tax_rate(Rate::from_bps(self.tax_rate_bps))
            .service_charge_rate(Rate::from_bps(self.service_charge_bps))
            .creation_mode(self.creation_mode)
            .business_utc_offset_minutes(self.business_utc_offset_minutes)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

fn serialize_display<S: serde::Serializer>(mode: &CreationMode, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(mode)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
