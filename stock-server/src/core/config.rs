use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use shared::models::DEFAULT_LOW_STOCK_THRESHOLD;

use crate::auth::JwtConfig;
use crate::auth::jwt::{MIN_SECRET_LEN, generate_dev_secret};
use crate::inventory::RetryPolicy;
use crate::utils::time::parse_timezone;
use crate::utils::{AppError, AppResult};

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|--------|------|
/// | WORK_DIR | ./data | Working directory (database/, logs/) |
/// | DATABASE_URL | sqlite:<WORK_DIR>/database/stock.db | SQLite database |
/// | HTTP_PORT | 3000 | HTTP port |
/// | ENVIRONMENT | development | Runtime environment |
/// | TIMEZONE | UTC | Business timezone for day boundaries, report buckets and POS numbers |
/// | LOW_STOCK_THRESHOLD | 10 | Default threshold for new inventory records |
/// | MUTATION_RETRY_LIMIT | 3 | Retries on concurrent modification |
/// | MUTATION_TIMEOUT_MS | 5000 | Timeout per stock/order transaction (ms) |
/// | REQUEST_TIMEOUT_MS | 30000 | HTTP request timeout (ms) |
/// | LOG_LEVEL | info | Log level |
/// | LOG_JSON | false | Write log files as JSON |
/// | JWT_SECRET | generated in development | Token verification key (32+ characters) |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/stock HTTP_PORT=8080 TIMEZONE=Europe/Madrid cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory
    pub work_dir: String,
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Business timezone
    pub timezone: Tz,
    pub low_stock_threshold: i64,
    pub mutation_retry_limit: u32,
    pub mutation_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log_level: String,
    pub log_json: bool,
    /// JWT settings
    pub jwt: JwtConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `JWT_SECRET` is mandatory outside development.
    pub fn from_env() -> AppResult<Self> {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite:{work_dir}/database/stock.db"));

        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) if secret.len() >= MIN_SECRET_LEN => secret,
            Ok(_) => {
                return Err(AppError::config(format!(
                    "JWT_SECRET must be at least {MIN_SECRET_LEN} characters long"
                )));
            }
            Err(_) if environment == "development" => {
                tracing::warn!("JWT_SECRET not set, generating a temporary development key");
                generate_dev_secret()
            }
            Err(_) => {
                return Err(AppError::config(format!(
                    "JWT_SECRET must be set in {environment}"
                )));
            }
        };

        let config = Self {
            database_url,
            http_port: env_or("HTTP_PORT", 3000),
            timezone: parse_timezone(
                &std::env::var("TIMEZONE").unwrap_or_else(|_| "UTC".into()),
            ),
            low_stock_threshold: env_or("LOW_STOCK_THRESHOLD", DEFAULT_LOW_STOCK_THRESHOLD),
            mutation_retry_limit: env_or("MUTATION_RETRY_LIMIT", 3),
            mutation_timeout_ms: env_or("MUTATION_TIMEOUT_MS", 5000),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            jwt: JwtConfig::new(secret),
            work_dir,
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Test configuration: fixed secret, UTC, default threshold
    pub fn for_tests(work_dir: impl Into<String>) -> Self {
        let work_dir = work_dir.into();
        Self {
            database_url: format!("sqlite:{work_dir}/database/stock.db"),
            http_port: 0,
            environment: "test".into(),
            timezone: Tz::UTC,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            mutation_retry_limit: 5,
            mutation_timeout_ms: 5000,
            request_timeout_ms: 30000,
            log_level: "debug".into(),
            log_json: false,
            jwt: JwtConfig::new("test-secret-key-that-is-long-enough-0123456789"),
            work_dir,
        }
    }

    fn validate(&self) -> AppResult<()> {
        if self.low_stock_threshold < 0 {
            return Err(AppError::config("LOW_STOCK_THRESHOLD must not be negative"));
        }
        if self.mutation_timeout_ms == 0 {
            return Err(AppError::config("MUTATION_TIMEOUT_MS must be positive"));
        }
        Ok(())
    }

    pub fn database_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("database")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Retry policy for stock and order transactions
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.mutation_retry_limit,
            Duration::from_millis(self.mutation_timeout_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Whether running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_tests_paths() {
        let config = Config::for_tests("/tmp/stock");
        assert_eq!(config.database_url, "sqlite:/tmp/stock/database/stock.db");
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/stock/logs"));
        assert!(config.jwt.secret.len() >= MIN_SECRET_LEN);
        assert!(!config.is_production());
        assert_eq!(config.retry_policy().max_retries, 5);
    }

    #[test]
    fn test_validate() {
        let mut config = Config::for_tests("/tmp/stock");
        assert!(config.validate().is_ok());
        config.low_stock_threshold = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_falls_back_on_parse_error() {
        assert_eq!(env_or("STOCK_SERVER_TEST_UNSET_VARIABLE", 42u16), 42);
    }
}
