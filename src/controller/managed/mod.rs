//! # Managed Resources
//!
//! Contract between the generic reconcile driver and the per-kind external
//! clients, plus the driver itself.
//!
//! A kind plugs in by implementing `Connector<K>`, which resolves credentials
//! and returns an `ExternalClient<K>` bound to a fresh Vault adapter. The
//! driver then runs observe, followed by create or update as needed, on
//! every reconcile and delete when the resource goes away.

mod reconciler;

pub use reconciler::{reconcile, ManagedReconciler};

use crate::controller::ManagedError;
use crate::crd::{DeletionPolicy, Managed};
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Values published to the resource's connection secret
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// What the external system currently holds for a resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    /// Nothing exists yet; the driver will create it
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn exists(up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            connection_details: ConnectionDetails::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Operations on the external object backing a resource of kind `K`
#[async_trait]
pub trait ExternalClient<K: Managed>: Send + Sync {
    async fn observe(&self, resource: &K) -> Result<ExternalObservation, ManagedError>;

    async fn create(&self, resource: &K) -> Result<ExternalCreation, ManagedError>;

    async fn update(&self, resource: &K) -> Result<ExternalUpdate, ManagedError>;

    async fn delete(&self, resource: &K) -> Result<(), ManagedError>;
}

/// Produces an `ExternalClient` for one resource
#[async_trait]
pub trait Connector<K: Managed>: Send + Sync {
    async fn connect(&self, resource: &K) -> Result<Box<dyn ExternalClient<K>>, ManagedError>;
}

/// Result of bringing the external object in line with the spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created(ConnectionDetails),
    Updated(ConnectionDetails),
    UpToDate(ConnectionDetails),
}

impl ApplyOutcome {
    pub fn connection_details(&self) -> &ConnectionDetails {
        match self {
            Self::Created(details) | Self::Updated(details) | Self::UpToDate(details) => details,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::UpToDate(_) => "up-to-date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    /// `deletionPolicy: Orphan` left the external object in place
    Orphaned,
}

/// Connect, observe, then create or update as needed
///
/// # Errors
/// Returns the first error raised by connect, observe, create or update.
pub async fn apply_external<K: Managed>(
    connector: &dyn Connector<K>,
    resource: &K,
) -> Result<ApplyOutcome, ManagedError> {
    let kind = K::kind(&());
    let external = connector.connect(resource).await?;

    metrics::record_external_operation(&kind, "observe");
    let observation = external.observe(resource).await?;
    debug!(
        exists = observation.resource_exists,
        up_to_date = observation.resource_up_to_date,
        "Observed external resource"
    );

    if !observation.resource_exists {
        metrics::record_external_operation(&kind, "create");
        let creation = external.create(resource).await?;
        info!("Created external resource");
        return Ok(ApplyOutcome::Created(creation.connection_details));
    }

    if !observation.resource_up_to_date {
        metrics::record_external_operation(&kind, "update");
        let update = external.update(resource).await?;
        info!("Updated external resource");
        let mut details = observation.connection_details;
        details.extend(update.connection_details);
        return Ok(ApplyOutcome::Updated(details));
    }

    Ok(ApplyOutcome::UpToDate(observation.connection_details))
}

/// Delete the external object unless the resource orphans it
///
/// # Errors
/// Returns the error raised by connect or delete.
pub async fn cleanup_external<K: Managed>(
    connector: &dyn Connector<K>,
    resource: &K,
) -> Result<CleanupOutcome, ManagedError> {
    if resource.resource_spec().deletion_policy == DeletionPolicy::Orphan {
        info!("Deletion policy is Orphan, leaving external resource in place");
        return Ok(CleanupOutcome::Orphaned);
    }

    let external = connector.connect(resource).await?;
    metrics::record_external_operation(&K::kind(&()), "delete");
    external.delete(resource).await?;
    info!("Deleted external resource");
    Ok(CleanupOutcome::Deleted)
}
