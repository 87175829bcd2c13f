//! Application configuration loaded from environment variables.

use domain::{Money, StandardPricing};
use thiserror::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("LOG_FORMAT must be 'text' or 'json', got {0:?}")]
    InvalidLogFormat(String),
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `4000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `text` or `json` (default `text`)
/// - `DATABASE_URL`: PostgreSQL URL; when unset the in-memory store is used
/// - `FREE_SHIPPING_THRESHOLD_CENTS`: subtotals above this ship free (default `50000`)
/// - `FLAT_SHIPPING_CENTS`: shipping fee below the threshold (default `5000`)
/// - `TAX_RATE_BPS`: tax rate in basis points (default `0`)
/// - `ADMIN_EMAIL`: when set, an admin account with this email is created at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub free_shipping_threshold_cents: i64,
    pub flat_shipping_cents: i64,
    pub tax_rate_bps: u32,
    pub admin_email: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let log_format = match lookup("LOG_FORMAT") {
            None => defaults.log_format,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "text" | "" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::InvalidLogFormat(value)),
            },
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: number(&lookup, "PORT", defaults.port)?,
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            free_shipping_threshold_cents: number(
                &lookup,
                "FREE_SHIPPING_THRESHOLD_CENTS",
                defaults.free_shipping_threshold_cents,
            )?,
            flat_shipping_cents: number(
                &lookup,
                "FLAT_SHIPPING_CENTS",
                defaults.flat_shipping_cents,
            )?,
            tax_rate_bps: number(&lookup, "TAX_RATE_BPS", defaults.tax_rate_bps)?,
            admin_email: lookup("ADMIN_EMAIL").filter(|email| !email.trim().is_empty()),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pricing(&self) -> StandardPricing {
        StandardPricing {
            free_shipping_over: Money::from_cents(self.free_shipping_threshold_cents),
            flat_shipping: Money::from_cents(self.flat_shipping_cents),
            tax_rate_bps: self.tax_rate_bps,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            free_shipping_threshold_cents: 50_000,
            flat_shipping_cents: 5_000,
            tax_rate_bps: 0,
            admin_email: None,
        }
    }
}

fn number<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}
