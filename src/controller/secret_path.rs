//! # SecretPath Reconciler
//!
//! Makes sure a path exists inside the mount of the owning Engine. The path
//! is seeded with a placeholder value; its content is never reconciled.

use crate::controller::connector::CredentialsSource;
use crate::controller::managed::{
    Connector, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
};
use crate::controller::owner::OwnerResolver;
use crate::controller::ManagedError;
use crate::crd::{Engine, Managed, SecretPath};
use crate::provider::{ClientFactory, SecretData, SecretManager};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// Value written to a freshly created path
pub fn placeholder_data() -> SecretData {
    let mut data = SecretData::new();
    data.insert(
        "secret".to_string(),
        serde_json::Value::String("empty".to_string()),
    );
    data
}

pub struct SecretPathConnector {
    credentials: Arc<dyn CredentialsSource>,
    factory: Arc<dyn ClientFactory>,
    owners: Arc<dyn OwnerResolver>,
}

impl SecretPathConnector {
    pub fn new(
        credentials: Arc<dyn CredentialsSource>,
        factory: Arc<dyn ClientFactory>,
        owners: Arc<dyn OwnerResolver>,
    ) -> Self {
        Self {
            credentials,
            factory,
            owners,
        }
    }
}

#[async_trait]
impl Connector<SecretPath> for SecretPathConnector {
    async fn connect(
        &self,
        resource: &SecretPath,
    ) -> Result<Box<dyn ExternalClient<SecretPath>>, ManagedError> {
        let credentials = self
            .credentials
            .credentials(resource.resource_spec().provider_config_name())
            .await?;
        let secrets = self
            .factory
            .secret_manager(&credentials)
            .map_err(ManagedError::NewClient)?;
        Ok(Box::new(SecretPathExternal::new(
            secrets,
            Arc::clone(&self.owners),
        )))
    }
}

pub struct SecretPathExternal {
    secrets: Arc<dyn SecretManager>,
    owners: Arc<dyn OwnerResolver>,
}

impl SecretPathExternal {
    pub fn new(secrets: Arc<dyn SecretManager>, owners: Arc<dyn OwnerResolver>) -> Self {
        Self { secrets, owners }
    }

    /// Owning Engine, or `EngineNotFound` naming the engine the path points at
    async fn require_engine(&self, resource: &SecretPath) -> Result<Engine, ManagedError> {
        let engine = &resource.spec.for_provider.engine;
        match self.owners.engine(engine).await {
            Ok(owner) => Ok(owner),
            Err(ManagedError::NoOwnerReference) => {
                Err(ManagedError::EngineNotFound(engine.clone()))
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ExternalClient<SecretPath> for SecretPathExternal {
    async fn observe(&self, resource: &SecretPath) -> Result<ExternalObservation, ManagedError> {
        let engine = self.require_engine(resource).await?;
        let path = &resource.spec.for_provider.path;

        match self
            .secrets
            .get_secrets(&engine.name_any(), path, &engine.spec.for_provider.options)
            .await
        {
            Ok(_) => Ok(ExternalObservation::exists(true)),
            Err(e) if e.is_path_not_found() => Ok(ExternalObservation::absent()),
            Err(e) => Err(ManagedError::ReadingPath(e)),
        }
    }

    async fn create(&self, resource: &SecretPath) -> Result<ExternalCreation, ManagedError> {
        let engine = self.require_engine(resource).await?;
        self.secrets
            .put(
                &engine.name_any(),
                &resource.spec.for_provider.path,
                &placeholder_data(),
                &engine.spec.for_provider.options,
            )
            .await
            .map_err(ManagedError::CreatingPath)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, _resource: &SecretPath) -> Result<ExternalUpdate, ManagedError> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, resource: &SecretPath) -> Result<(), ManagedError> {
        let engine = match self.owners.engine(&resource.spec.for_provider.engine).await {
            Ok(engine) => engine,
            Err(ManagedError::NoOwnerReference) => {
                debug!("Owning engine is gone, nothing left to delete");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match self
            .secrets
            .delete_path(
                &engine.name_any(),
                &resource.spec.for_provider.path,
                &engine.spec.for_provider.options,
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_path_not_found() => {
                debug!("Path already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
