//! Application configuration
//!
//! Loads configuration from environment variables with sensible defaults.

use chrono::FixedOffset;
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database connection URL
    pub database_url: String,
    /// LINE channel secret, used to verify webhook signatures
    pub line_channel_secret: Option<String>,
    /// LINE channel access token for reply/push calls
    pub line_channel_access_token: String,
    /// LINE Messaging API base URL
    pub line_api_base: String,
    /// Timeout for a single LINE API call
    pub line_timeout: Duration,
    /// Bearer token for the dashboard API and admin actions
    pub admin_api_token: Option<String>,
    /// Business time zone used for "today" and for displayed timestamps
    pub business_offset: FixedOffset,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Environment (development/production)
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        };

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| ConfigError::Missing("DATABASE_URL is required".to_string()))?;

        let line_channel_secret = non_empty("LINE_CHANNEL_SECRET");
        let line_channel_access_token = non_empty("LINE_CHANNEL_ACCESS_TOKEN").unwrap_or_default();

        let business_utc_offset_hours = match non_empty("BUSINESS_UTC_OFFSET_HOURS") {
            Some(raw) => raw.parse::<i32>().map_err(|_| {
                ConfigError::Invalid(format!("BUSINESS_UTC_OFFSET_HOURS: {}", raw))
            })?,
            None => 9,
        };
        let business_offset = (-12..=14)
            .contains(&business_utc_offset_hours)
            .then(|| FixedOffset::east_opt(business_utc_offset_hours * 3600))
            .flatten()
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "BUSINESS_UTC_OFFSET_HOURS out of range: {}",
                    business_utc_offset_hours
                ))
            })?;

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_url,
            line_channel_secret,
            line_channel_access_token,
            line_api_base: non_empty("LINE_API_BASE")
                .unwrap_or_else(|| "https://api.line.me".to_string()),
            line_timeout: Duration::from_secs(
                env::var("LINE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            admin_api_token: non_empty("ADMIN_API_TOKEN"),
            business_offset,
            max_body_size: env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB default
            cors_origins: env::var("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| vec!["http://localhost:3000".to_string()]),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that are unsafe to run with in production
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if self.line_channel_secret.is_none() {
            return Err(ConfigError::Missing(
                "LINE_CHANNEL_SECRET is required in production".to_string(),
            ));
        }
        if self.line_channel_access_token.is_empty() {
            return Err(ConfigError::Missing(
                "LINE_CHANNEL_ACCESS_TOKEN is required in production".to_string(),
            ));
        }
        if self.admin_api_token.is_none() {
            return Err(ConfigError::Missing(
                "ADMIN_API_TOKEN is required in production".to_string(),
            ));
        }
        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_url: "postgres://localhost/repotomo_test".to_string(),
            line_channel_secret: Some("test-channel-secret".to_string()),
            line_channel_access_token: "test-access-token".to_string(),
            line_api_base: "http://127.0.0.1:9".to_string(),
            line_timeout: Duration::from_secs(1),
            admin_api_token: None,
            business_offset: FixedOffset::east_opt(9 * 3600).unwrap(),
            max_body_size: 1024 * 1024,
            cors_origins: Vec::new(),
            environment: Environment::Development,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_allows_missing_admin_token() {
        let config = Config::for_tests();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_admin_token() {
        let mut config = Config::for_tests();
        config.environment = Environment::Production;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref m) if m.contains("ADMIN_API_TOKEN")));

        config.admin_api_token = Some("dashboard-token".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_line_credentials() {
        let mut config = Config::for_tests();
        config.environment = Environment::Production;
        config.admin_api_token = Some("dashboard-token".to_string());

        config.line_channel_access_token = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        config.line_channel_access_token = "token".to_string();
        config.line_channel_secret = None;
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }
}
