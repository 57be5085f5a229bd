//! Generic reconcile driver for managed resources
//!
//! Adds the managed finalizer, runs the external client and writes the
//! `Ready` and `Synced` conditions back to the resource status.

use super::{apply_external, cleanup_external, ApplyOutcome, ConnectionDetails, Connector};
use crate::config::ControllerConfig;
use crate::constants::{CONNECTION_SECRET_TYPE, FIELD_MANAGER, MANAGED_FINALIZER};
use crate::controller::backoff::BackoffTable;
use crate::controller::{ManagedError, ReconcilerError};
use crate::crd::{Condition, Managed, ResourceStatus, SecretReference};
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, Patch, PatchParams};
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event as FinalizerEvent};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn, Instrument};

/// Shared context of the controller for kind `K`
pub struct ManagedReconciler<K: Managed> {
    client: Client,
    connector: Arc<dyn Connector<K>>,
    config: ControllerConfig,
    backoff: BackoffTable,
}

impl<K: Managed> std::fmt::Debug for ManagedReconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedReconciler")
            .field("kind", &K::kind(&()))
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<K: Managed> ManagedReconciler<K> {
    pub fn new(client: Client, connector: Arc<dyn Connector<K>>, config: ControllerConfig) -> Self {
        let backoff = BackoffTable::new(config.backoff_min_secs, config.backoff_max_secs);
        Self {
            client,
            connector,
            config,
            backoff,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Advance the error backoff of `name`, returning the delay and error count
    ///
    /// `None` when the backoff table cannot be locked.
    pub fn next_backoff(&self, name: &str) -> Option<(u64, u32)> {
        self.backoff.next(name)
    }

    fn reset_backoff(&self, name: &str) {
        if self.backoff.reset(name) {
            debug!("Cleared error backoff");
        }
    }

    /// Drop the backoff of resources for which `exists` is false
    pub fn prune_backoff(&self, exists: impl Fn(&str) -> bool) {
        let dropped = self.backoff.retain(exists);
        if dropped > 0 {
            debug!(dropped, "Dropped error backoff of deleted resources");
        }
    }

    async fn apply(&self, resource: &K) -> Result<Action, ManagedError> {
        let kind = K::kind(&());

        match apply_external(self.connector.as_ref(), resource).await {
            Ok(outcome) => {
                self.publish_connection_details(resource, outcome.connection_details())
                    .await?;
                self.patch_status(resource, status_after_apply(resource, &outcome))
                    .await?;

                let requeue_after = match outcome {
                    ApplyOutcome::UpToDate(_) => self.config.poll_interval(),
                    ApplyOutcome::Created(_) | ApplyOutcome::Updated(_) => {
                        self.config.short_wait()
                    }
                };
                metrics::increment_requeues(&kind, outcome.label());
                Ok(Action::requeue(requeue_after))
            }
            Err(error) => {
                let mut status = current_status(resource);
                status.set_condition(Condition::reconcile_error(error.to_string()));
                if let Err(patch_error) = self.patch_status(resource, status).await {
                    warn!(error = %patch_error, "Failed to record reconcile error in status");
                }
                Err(error)
            }
        }
    }

    async fn cleanup(&self, resource: &K) -> Result<Action, ManagedError> {
        let mut status = current_status(resource);
        status.set_condition(Condition::deleting());
        if let Err(error) = self.patch_status(resource, status).await {
            debug!(error = %error, "Could not mark resource as deleting");
        }

        let outcome = cleanup_external(self.connector.as_ref(), resource).await?;
        self.reset_backoff(&resource.name_any());
        debug!(?outcome, "Cleanup finished");
        Ok(Action::await_change())
    }

    async fn patch_status(&self, resource: &K, status: ResourceStatus) -> Result<(), ManagedError> {
        if resource.resource_status() == Some(&status) {
            return Ok(());
        }

        let api: Api<K> = Api::all(self.client.clone());
        let patch = serde_json::json!({ "status": status });
        api.patch_status(&resource.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn publish_connection_details(
        &self,
        resource: &K,
        details: &ConnectionDetails,
    ) -> Result<(), ManagedError> {
        let Some(target) = resource
            .resource_spec()
            .write_connection_secret_to_ref
            .as_ref()
        else {
            return Ok(());
        };
        if details.is_empty() {
            return Ok(());
        }

        let secret = connection_secret(resource, target, details);
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &target.namespace);
        api.patch(
            &target.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await?;
        debug!(
            secret.namespace = %target.namespace,
            secret.name = %target.name,
            "Published connection details"
        );
        Ok(())
    }
}

/// Reconcile one managed resource
///
/// # Errors
/// Returns `ReconcilerError` when the finalizer could not be managed or the
/// external client failed; the error policy decides the retry delay.
pub async fn reconcile<K: Managed>(
    resource: Arc<K>,
    ctx: Arc<ManagedReconciler<K>>,
) -> Result<Action, ReconcilerError> {
    let kind = K::kind(&()).to_string();
    let name = resource.name_any();
    let span = info_span!(
        "controller.reconcile",
        resource.kind = %kind,
        resource.name = %name
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations(&kind);

        let reconciler = ctx.as_ref();
        let api: Api<K> = Api::all(reconciler.client.clone());
        let result = finalizer(&api, MANAGED_FINALIZER, resource, |event| async move {
            match event {
                FinalizerEvent::Apply(resource) => reconciler.apply(&resource).await,
                FinalizerEvent::Cleanup(resource) => reconciler.cleanup(&resource).await,
            }
        })
        .await;

        metrics::observe_reconciliation_duration(&kind, start.elapsed().as_secs_f64());
        if result.is_ok() {
            ctx.reset_backoff(&name);
        }
        result.map_err(ReconcilerError::from)
    }
    .instrument(span)
    .await
}

fn current_status<K: Managed>(resource: &K) -> ResourceStatus {
    resource.resource_status().cloned().unwrap_or_default()
}

/// Status after a successful apply
pub fn status_after_apply<K: Managed>(resource: &K, outcome: &ApplyOutcome) -> ResourceStatus {
    let mut status = current_status(resource);
    status.set_condition(match outcome {
        ApplyOutcome::Created(_) => Condition::creating(),
        ApplyOutcome::Updated(_) | ApplyOutcome::UpToDate(_) => Condition::available(),
    });
    status.set_condition(Condition::reconcile_success());
    status.observed_generation = resource.meta().generation;
    status
}

/// Secret holding `details`, owned by `resource`
pub fn connection_secret<K: Managed>(
    resource: &K,
    target: &SecretReference,
    details: &ConnectionDetails,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            owner_references: resource.controller_owner_ref(&()).map(|r| vec![r]),
            ..ObjectMeta::default()
        },
        type_: Some(CONNECTION_SECRET_TYPE.to_string()),
        data: Some(
            details
                .iter()
                .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                .collect(),
        ),
        ..Secret::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        Engine, EngineParameters, EngineSpec, ResourceSpec, CONDITION_READY, CONDITION_SYNCED,
    };

    fn engine() -> Engine {
        let mut engine = Engine::new(
            "team-a",
            EngineSpec {
                resource: ResourceSpec::default(),
                for_provider: EngineParameters {
                    storage: "kv".to_string(),
                    options: std::collections::BTreeMap::new(),
                },
            },
        );
        engine.metadata.generation = Some(3);
        engine.metadata.uid = Some("0b1c".to_string());
        engine
    }

    #[test]
    fn test_status_after_create_is_creating_and_synced() {
        let status = status_after_apply(&engine(), &ApplyOutcome::Created(ConnectionDetails::new()));
        let ready = status.condition(CONDITION_READY).unwrap();
        assert!(!ready.is_true());
        assert_eq!(ready.reason.as_deref(), Some("Creating"));
        assert!(status.condition(CONDITION_SYNCED).unwrap().is_true());
        assert_eq!(status.observed_generation, Some(3));
    }

    #[test]
    fn test_status_after_up_to_date_replaces_previous_error() {
        let mut resource = engine();
        let mut previous = ResourceStatus::default();
        previous.set_condition(Condition::reconcile_error("vault sealed"));
        resource.status = Some(previous);

        let status = status_after_apply(&resource, &ApplyOutcome::UpToDate(ConnectionDetails::new()));
        assert!(status.condition(CONDITION_READY).unwrap().is_true());
        let synced = status.condition(CONDITION_SYNCED).unwrap();
        assert!(synced.is_true());
        assert_eq!(synced.message, None);
    }

    #[test]
    fn test_connection_secret_is_owned_by_resource() {
        let target = SecretReference {
            name: "team-a-conn".to_string(),
            namespace: "crossplane-system".to_string(),
        };
        let details = ConnectionDetails::from([("address".to_string(), b"https://vault:8200".to_vec())]);
        let secret = connection_secret(&engine(), &target, &details);

        assert_eq!(secret.metadata.namespace.as_deref(), Some("crossplane-system"));
        assert_eq!(secret.type_.as_deref(), Some(CONNECTION_SECRET_TYPE));
        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners[0].kind, "Engine");
        assert_eq!(owners[0].name, "team-a");
        assert_eq!(
            secret.data.unwrap()["address"],
            ByteString(b"https://vault:8200".to_vec())
        );
    }
}
