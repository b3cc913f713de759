//! Application configuration loaded from environment variables.

use std::time::Duration;

use dispatcher::{CommitMode, DecodeFailurePolicy, DispatcherConfig};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `DATABASE_URL`: Postgres connection string; unset selects the in-memory store
/// - `OUTBOX_POLL_INTERVAL_SECS` (10), `OUTBOX_BATCH_SIZE` (100),
///   `OUTBOX_MAX_CONCURRENCY` (4), `OUTBOX_DELIVERY_TIMEOUT_SECS` (30),
///   `OUTBOX_LEASE_SECS` (60)
/// - `OUTBOX_COMMIT_MODE`: `per_message` or `batch`
/// - `OUTBOX_DECODE_FAILURES`: `permanent` or `transient`
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub dispatcher: DispatcherConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the raw value of a
    /// variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let secs = |key: &str, default: Duration| {
            parsed(key).map(Duration::from_secs).unwrap_or(default)
        };

        let base = defaults.dispatcher;
        let dispatcher = DispatcherConfig::new()
            .with_poll_interval(secs("OUTBOX_POLL_INTERVAL_SECS", base.poll_interval))
            .with_batch_size(
                parsed("OUTBOX_BATCH_SIZE")
                    .map(|n| n as usize)
                    .unwrap_or(base.batch_size),
            )
            .with_max_concurrency(
                parsed("OUTBOX_MAX_CONCURRENCY")
                    .map(|n| n as usize)
                    .unwrap_or(base.max_concurrency),
            )
            .with_delivery_timeout(secs("OUTBOX_DELIVERY_TIMEOUT_SECS", base.delivery_timeout))
            .with_lease_duration(secs("OUTBOX_LEASE_SECS", base.lease_duration))
            .with_commit_mode(
                lookup("OUTBOX_COMMIT_MODE")
                    .and_then(|v| v.parse::<CommitMode>().ok())
                    .unwrap_or_default(),
            )
            .with_decode_failures(
                lookup("OUTBOX_DECODE_FAILURES")
                    .and_then(|v| v.parse::<DecodeFailurePolicy>().ok())
                    .unwrap_or_default(),
            )
            .with_worker_id(base.worker_id);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            dispatcher,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            dispatcher: DispatcherConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = from_vars(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.database_url.is_none());
        assert_eq!(config.dispatcher.poll_interval, Duration::from_secs(10));
        assert_eq!(config.dispatcher.batch_size, 100);
        assert_eq!(config.dispatcher.commit_mode, CommitMode::PerMessage);
        assert_eq!(
            config.dispatcher.decode_failures,
            DecodeFailurePolicy::Permanent
        );
    }

    #[test]
    fn test_reads_overrides() {
        let config = from_vars(&[
            ("PORT", "8080"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("OUTBOX_POLL_INTERVAL_SECS", "2"),
            ("OUTBOX_BATCH_SIZE", "25"),
            ("OUTBOX_MAX_CONCURRENCY", "8"),
            ("OUTBOX_DELIVERY_TIMEOUT_SECS", "5"),
            ("OUTBOX_LEASE_SECS", "120"),
            ("OUTBOX_COMMIT_MODE", "batch"),
            ("OUTBOX_DECODE_FAILURES", "transient"),
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/catalog")
        );
        assert_eq!(config.dispatcher.poll_interval, Duration::from_secs(2));
        assert_eq!(config.dispatcher.batch_size, 25);
        assert_eq!(config.dispatcher.max_concurrency, 8);
        assert_eq!(config.dispatcher.delivery_timeout, Duration::from_secs(5));
        assert_eq!(config.dispatcher.lease_duration, Duration::from_secs(120));
        assert_eq!(config.dispatcher.commit_mode, CommitMode::Batch);
        assert_eq!(
            config.dispatcher.decode_failures,
            DecodeFailurePolicy::Transient
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_vars(&[
            ("PORT", "http"),
            ("OUTBOX_BATCH_SIZE", "-1"),
            ("OUTBOX_COMMIT_MODE", "sometimes"),
            ("DATABASE_URL", "  "),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.dispatcher.batch_size, 100);
        assert_eq!(config.dispatcher.commit_mode, CommitMode::PerMessage);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
