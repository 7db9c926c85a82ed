//! API configuration

use std::time::Duration;

use serde::Deserialize;

use core_kernel::{Backoff, RetryPolicy, TemporalError, Timezone};
use domain_dashboard::DashboardConfig;

/// API configuration, read from `API_*` environment variables
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// IANA zone that decides which calendar month is "this month"
    pub business_timezone: String,
    /// Lifetime of cached query results
    pub cache_ttl_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/warranty".to_string(),
            log_level: "info".to_string(),
            business_timezone: "Europe/Oslo".to_string(),
            cache_ttl_secs: 300,
            retry_max_attempts: 3,
            retry_base_delay_ms: 200,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cache, retry and timezone settings for the dashboard service
    pub fn dashboard_config(&self) -> Result<DashboardConfig, TemporalError> {
        Ok(DashboardConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            retry: RetryPolicy::new(
                self.retry_max_attempts,
                Duration::from_millis(self.retry_base_delay_ms),
                Backoff::Exponential,
            ),
            timezone: Timezone::parse(&self.business_timezone)?,
        })
    }
}
