//! # Metrics
//!
//! Prometheus metrics for monitoring the provider.
//!
//! ## Metrics Exposed
//!
//! - `vault_provider_reconciliations_total` - Reconciliations by resource kind
//! - `vault_provider_reconciliation_errors_total` - Failed reconciliations by resource kind
//! - `vault_provider_reconciliation_duration_seconds` - Duration of reconciliations by resource kind
//! - `vault_provider_external_operations_total` - Observe/create/update/delete calls by resource kind
//! - `vault_provider_requeues_total` - Requeues by resource kind and reason
//! - `vault_provider_vault_requests_total` - Vault HTTP requests by operation
//! - `vault_provider_vault_request_errors_total` - Failed Vault HTTP requests by operation
//! - `vault_provider_vault_request_duration_seconds` - Duration of Vault HTTP requests by operation

use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_provider_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_provider_reconciliation_errors_total",
            "Total number of reconciliation errors by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vault_provider_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static EXTERNAL_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_provider_external_operations_total",
            "Total number of external client operations by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create EXTERNAL_OPERATIONS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_provider_requeues_total",
            "Total number of requeues by resource kind and reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static VAULT_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_provider_vault_requests_total",
            "Total number of Vault HTTP requests by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create VAULT_REQUESTS_TOTAL metric - this should never happen")
});

static VAULT_REQUEST_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "vault_provider_vault_request_errors_total",
            "Total number of failed Vault HTTP requests by operation",
        ),
        &["operation"],
    )
    .expect("Failed to create VAULT_REQUEST_ERRORS_TOTAL metric - this should never happen")
});

static VAULT_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "vault_provider_vault_request_duration_seconds",
            "Duration of Vault HTTP requests in seconds by operation",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create VAULT_REQUEST_DURATION metric - this should never happen")
});

/// Register every collector with `REGISTRY`
///
/// # Errors
/// Returns an error if a collector is already registered.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(EXTERNAL_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VAULT_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VAULT_REQUEST_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VAULT_REQUEST_DURATION.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

/// Count an observe/create/update/delete call made by the managed-resource driver
pub fn record_external_operation(kind: &str, operation: &str) {
    EXTERNAL_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_requeues(kind: &str, reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind, reason]).inc();
}

/// Record one Vault HTTP request
pub fn record_vault_request(operation: &str, duration: f64) {
    VAULT_REQUESTS_TOTAL.with_label_values(&[operation]).inc();
    VAULT_REQUEST_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_vault_request_errors(operation: &str) {
    VAULT_REQUEST_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.with_label_values(&["Engine"]).get();
        increment_reconciliations("Engine");
        let after = RECONCILIATIONS_TOTAL.with_label_values(&["Engine"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Policy"])
            .get();
        increment_reconciliation_errors("Policy");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["Policy"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_observe_reconciliation_duration() {
        let before = RECONCILIATION_DURATION
            .with_label_values(&["SecretPath"])
            .get_sample_count();
        observe_reconciliation_duration("SecretPath", 0.25);
        let after = RECONCILIATION_DURATION
            .with_label_values(&["SecretPath"])
            .get_sample_count();
        assert_eq!(after, before + 1);
    }

    #[test]
    fn test_record_external_operation_is_labelled_by_operation() {
        let before_create = EXTERNAL_OPERATIONS_TOTAL
            .with_label_values(&["Engine", "create"])
            .get();
        let before_delete = EXTERNAL_OPERATIONS_TOTAL
            .with_label_values(&["Engine", "delete"])
            .get();
        record_external_operation("Engine", "create");
        assert_eq!(
            EXTERNAL_OPERATIONS_TOTAL
                .with_label_values(&["Engine", "create"])
                .get(),
            before_create + 1u64
        );
        assert_eq!(
            EXTERNAL_OPERATIONS_TOTAL
                .with_label_values(&["Engine", "delete"])
                .get(),
            before_delete
        );
    }

    #[test]
    fn test_record_vault_request() {
        let before = VAULT_REQUESTS_TOTAL.with_label_values(&["policy.get"]).get();
        record_vault_request("policy.get", 0.02);
        let after = VAULT_REQUESTS_TOTAL.with_label_values(&["policy.get"]).get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_vault_request_errors() {
        let before = VAULT_REQUEST_ERRORS_TOTAL
            .with_label_values(&["mount.create"])
            .get();
        increment_vault_request_errors("mount.create");
        let after = VAULT_REQUEST_ERRORS_TOTAL
            .with_label_values(&["mount.create"])
            .get();
        assert_eq!(after, before + 1u64);
    }
}
