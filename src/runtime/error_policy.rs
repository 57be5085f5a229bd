//! # Error Policy
//!
//! Requeue policy for failed reconciliations.

use crate::controller::managed::ManagedReconciler;
use crate::controller::ReconcilerError;
use crate::crd::Managed;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource so one failing resource does not
/// slow down the others. It is cleared by the next successful reconcile.
pub fn handle_reconciliation_error<K: Managed>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<ManagedReconciler<K>>,
) -> Action {
    let kind = K::kind(&());
    let name = obj.name_any();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = %kind,
        resource.name = %name,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {kind} {name}: {error:?}");
    observability::metrics::increment_reconciliation_errors(&kind);

    let Some((backoff_seconds, error_count)) = ctx.next_backoff(&name) else {
        let fallback = ctx.config().reconciliation_error_requeue_duration();
        warn!(
            "Failed to lock backoff state, requeueing in {}s",
            fallback.as_secs()
        );
        observability::metrics::increment_requeues(&kind, "error-fallback");
        return Action::requeue(fallback);
    };

    let delay = Duration::from_secs(backoff_seconds);
    let next_trigger_time =
        chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
    info!(
        "Retrying with Fibonacci backoff: {backoff_seconds}s (error count: {error_count}, next retry: {})",
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues(&kind, "error-backoff");
    Action::requeue(delay)
}
