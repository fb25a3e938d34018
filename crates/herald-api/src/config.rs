//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;

use crate::auth::AuthorizationScheme;
use crate::error::AppError;

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Address to bind.
    pub addr: SocketAddr,
    /// Maximum pool size.
    pub max_connections: u32,
    /// How long events are kept; `None` keeps them forever.
    pub retention: Option<TimeDelta>,
    /// How often the retention sweep runs.
    pub cleanup_interval: Duration,
    /// Filter applied to `GET /events`.
    pub authorization: AuthorizationScheme,
    /// OTLP collector endpoint; `None` disables export.
    pub otlp_endpoint: Option<String>,
}

impl ServerConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or any
    /// value fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or any
    /// value fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".into())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let retention = lookup("EVENT_RETENTION_SECS")
            .map(|raw| parse_value::<i64>("EVENT_RETENTION_SECS", &raw))
            .transpose()?
            .map(|secs| {
                TimeDelta::try_seconds(secs).ok_or_else(|| {
                    AppError::Config(format!("EVENT_RETENTION_SECS is out of range: {secs}"))
                })
            })
            .transpose()?;
        let cleanup_secs: u64 = parse_or(&lookup, "CLEANUP_INTERVAL_SECS", 300)?;
        if cleanup_secs == 0 {
            return Err(AppError::Config(
                "CLEANUP_INTERVAL_SECS must be greater than zero".into(),
            ));
        }

        let authorization = lookup("EVENT_AUTHORIZATION")
            .map(|raw| raw.parse::<AuthorizationScheme>())
            .transpose()
            .map_err(|e| AppError::Config(format!("EVENT_AUTHORIZATION: {e}")))?
            .unwrap_or(AuthorizationScheme::None);

        Ok(Self {
            database_url,
            addr,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            retention,
            cleanup_interval: Duration::from_secs(cleanup_secs),
            authorization,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} is invalid: {e}")))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}
