// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for crm-server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Cron expressions for the scheduled jobs. `None` keeps the job's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSchedules {
    /// Heartbeat job.
    pub heartbeat: Option<String>,
    /// Low-stock restock job.
    pub low_stock: Option<String>,
    /// Order reminder job.
    pub order_reminders: Option<String>,
    /// Weekly report job.
    pub report: Option<String>,
}

impl JobSchedules {
    /// Override for the job with this name.
    pub fn for_job(&self, name: &str) -> Option<&str> {
        match name {
            "heartbeat" => self.heartbeat.as_deref(),
            "low-stock" => self.low_stock.as_deref(),
            "order-reminders" => self.order_reminders.as_deref(),
            "report" => self.report.as_deref(),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (`postgres://...` or `sqlite:...`)
    pub database_url: String,
    /// HTTP server address
    pub http_addr: SocketAddr,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// GraphQL endpoint the scheduled jobs call
    pub graphql_url: String,
    /// Directory for job log files
    pub log_dir: PathBuf,
    /// Whether the cron scheduler runs inside `serve`
    pub scheduler_enabled: bool,
    /// Per-job schedule overrides
    pub schedules: JobSchedules,
    /// Per-request timeout of the GraphQL client
    pub client_timeout: Duration,
    /// Retries of the GraphQL client on transport failures
    pub client_retries: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("CRM_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .ok_or(ConfigError::MissingEnvVar("CRM_DATABASE_URL or DATABASE_URL"))?;

        let port: u16 = lookup("CRM_HTTP_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let http_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let db_max_connections = parse_or(&lookup, "CRM_DB_MAX_CONNECTIONS", 10)?;

        let graphql_url = lookup("CRM_GRAPHQL_URL")
            .unwrap_or_else(|| format!("http://localhost:{}/graphql", port));

        let log_dir = PathBuf::from(lookup("CRM_LOG_DIR").unwrap_or_else(|| "/tmp".to_string()));

        let scheduler_enabled = lookup("CRM_SCHEDULER_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let schedules = JobSchedules {
            heartbeat: lookup("CRM_HEARTBEAT_SCHEDULE"),
            low_stock: lookup("CRM_LOW_STOCK_SCHEDULE"),
            order_reminders: lookup("CRM_ORDER_REMINDERS_SCHEDULE"),
            report: lookup("CRM_REPORT_SCHEDULE"),
        };

        let client_timeout =
            Duration::from_secs(parse_or(&lookup, "CRM_CLIENT_TIMEOUT_SECS", 5)?);
        let client_retries = parse_or(&lookup, "CRM_CLIENT_RETRIES", 3)?;

        Ok(Self {
            database_url,
            http_addr,
            db_max_connections,
            graphql_url,
            log_dir,
            scheduler_enabled,
            schedules,
            client_timeout,
            client_retries,
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        None => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    /// The port number is invalid.
    #[error("Invalid port number")]
    InvalidPort,
    /// A numeric variable does not parse.
    #[error("Invalid value for {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite::memory:")]))
            .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.http_addr.port(), 8000);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.graphql_url, "http://localhost:8000/graphql");
        assert_eq!(config.log_dir, PathBuf::from("/tmp"));
        assert!(config.scheduler_enabled);
        assert_eq!(config.schedules, JobSchedules::default());
        assert_eq!(config.client_timeout, Duration::from_secs(5));
        assert_eq!(config.client_retries, 3);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CRM_DATABASE_URL", "postgres://localhost/crm"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("CRM_HTTP_PORT", "9100"),
            ("CRM_LOG_DIR", "/var/log/crm"),
            ("CRM_SCHEDULER_ENABLED", "false"),
            ("CRM_LOW_STOCK_SCHEDULE", "*/1 * * * *"),
            ("CRM_CLIENT_RETRIES", "0"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/crm");
        assert_eq!(config.graphql_url, "http://localhost:9100/graphql");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/crm"));
        assert!(!config.scheduler_enabled);
        assert_eq!(config.schedules.for_job("low-stock"), Some("*/1 * * * *"));
        assert_eq!(config.schedules.for_job("heartbeat"), None);
        assert_eq!(config.client_retries, 0);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("CRM_HTTP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("CRM_CLIENT_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for CRM_CLIENT_TIMEOUT_SECS: soon"
        );
    }
}
