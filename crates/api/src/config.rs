//! Runtime configuration loaded from the environment

use std::net::SocketAddr;
use std::time::Duration as StdDuration;

use time::Duration;

use crate::auth::jwt::MIN_SECRET_LENGTH;

pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 20;
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 7;
pub const DEFAULT_DB_TIMEOUT_SECS: u64 = 5;
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 365;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET is not set")]
    MissingJwtSecret,
    #[error("JWT_SECRET must be at least {} bytes", MIN_SECRET_LENGTH)]
    WeakJwtSecret,
    #[error("Invalid BIND_ADDRESS: {0}")]
    InvalidBindAddress(String),
}

/// Credentials for the admin account seeded at startup
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Absent means the in-process store
    pub database_url: Option<String>,
    pub db_timeout: StdDuration,
    pub bind_address: SocketAddr,
    pub allowed_origins: Vec<String>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("database_configured", &self.database_url.is_some())
            .field("db_timeout", &self.db_timeout)
            .field("bind_address", &self.bind_address)
            .field("allowed_origins", &self.allowed_origins)
            .field("bootstrap_admin", &self.bootstrap_admin)
            .finish_non_exhaustive()
    }
}

/// Read an integer in `1..=max`, falling back to `default` when absent or unusable
fn bounded_or_default<F>(lookup: &F, key: &str, default: i64, max: i64) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if (1..=max).contains(&value) => value,
        _ => {
            tracing::warn!(key = key, value = %raw, default = default, "Ignoring invalid value, using default");
            default
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::MissingJwtSecret)?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::WeakJwtSecret);
        }

        let access_minutes = bounded_or_default(
            &lookup,
            "ACCESS_TOKEN_TTL_MINUTES",
            DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
            MAX_ACCESS_TOKEN_TTL_MINUTES,
        );
        let refresh_days = bounded_or_default(
            &lookup,
            "REFRESH_TOKEN_TTL_DAYS",
            DEFAULT_REFRESH_TOKEN_TTL_DAYS,
            MAX_REFRESH_TOKEN_TTL_DAYS,
        );
        let db_timeout_secs = bounded_or_default(
            &lookup,
            "DB_TIMEOUT_SECS",
            DEFAULT_DB_TIMEOUT_SECS as i64,
            i64::MAX,
        );

        let bind_raw =
            non_empty(&lookup, "BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(bind_raw.clone()))?;

        let allowed_origins = non_empty(&lookup, "ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let bootstrap_admin = match (
            non_empty(&lookup, "BOOTSTRAP_ADMIN_EMAIL"),
            non_empty(&lookup, "BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email,
                password,
                name: non_empty(&lookup, "BOOTSTRAP_ADMIN_NAME")
                    .unwrap_or_else(|| "Administrator".to_string()),
            }),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must both be set; skipping admin bootstrap"
                );
                None
            }
        };

        Ok(Self {
            jwt_secret,
            access_token_ttl: Duration::minutes(access_minutes),
            refresh_token_ttl: Duration::days(refresh_days),
            database_url: non_empty(&lookup, "DATABASE_URL"),
            db_timeout: StdDuration::from_secs(db_timeout_secs as u64),
            bind_address,
            allowed_origins,
            bootstrap_admin,
        })
    }
}
