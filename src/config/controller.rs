//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between two observations of a resource that is up to date (seconds)
    pub poll_interval_secs: u64,
    /// Requeue after a successful create or update (seconds)
    pub short_wait_secs: u64,
    /// Reconciliation error requeue interval (seconds)
    /// Used when the backoff state of a resource cannot be read
    pub reconciliation_error_requeue_secs: u64,
    /// Fibonacci backoff lower bound (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff upper bound (seconds)
    pub backoff_max_secs: u64,
    /// Timeout applied to each Vault HTTP request (seconds)
    pub vault_request_timeout_secs: u64,
    /// HTTP port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Maximum concurrent reconciliations per resource kind
    pub max_concurrent_reconciliations: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            short_wait_secs: DEFAULT_SHORT_WAIT_SECS,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            vault_request_timeout_secs: DEFAULT_VAULT_REQUEST_TIMEOUT_SECS,
            metrics_port: DEFAULT_METRICS_PORT,
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// `from_env` is the production entry point; tests pass a map-backed lookup
    /// so they never touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        use crate::constants::*;
        let config = Self {
            poll_interval_secs: parse_or_default(&lookup, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS),
            short_wait_secs: parse_or_default(&lookup, "SHORT_WAIT_SECS", DEFAULT_SHORT_WAIT_SECS),
            reconciliation_error_requeue_secs: parse_or_default(
                &lookup,
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            backoff_min_secs: parse_or_default(&lookup, "BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: parse_or_default(&lookup, "BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            vault_request_timeout_secs: parse_or_default(
                &lookup,
                "VAULT_REQUEST_TIMEOUT_SECS",
                DEFAULT_VAULT_REQUEST_TIMEOUT_SECS,
            ),
            metrics_port: parse_or_default(&lookup, "METRICS_PORT", DEFAULT_METRICS_PORT),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "INFO".to_string()),
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "json".to_string()),
            max_concurrent_reconciliations: parse_or_default(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
        };
        config.normalized()
    }

    /// Clamp inconsistent values instead of failing start-up
    fn normalized(mut self) -> Self {
        if self.backoff_min_secs == 0 {
            self.backoff_min_secs = 1;
        }
        if self.backoff_max_secs < self.backoff_min_secs {
            self.backoff_max_secs = self.backoff_min_secs;
        }
        if self.poll_interval_secs == 0 {
            self.poll_interval_secs = crate::constants::DEFAULT_POLL_INTERVAL_SECS;
        }
        self
    }

    /// Whether logs are emitted as JSON lines
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn short_wait(&self) -> Duration {
        Duration::from_secs(self.short_wait_secs)
    }

    /// Get reconciliation error requeue duration
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    pub fn vault_request_timeout(&self) -> Duration {
        Duration::from_secs(self.vault_request_timeout_secs)
    }
}

/// Read a value from the lookup or return the default when absent or unparsable
fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
