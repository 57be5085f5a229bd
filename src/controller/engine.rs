//! # Engine Reconciler
//!
//! Mounts a secret engine at the Engine's name. Mount options are only
//! applied on create; later changes to them are not pushed to Vault.

use crate::controller::connector::CredentialsSource;
use crate::controller::managed::{
    Connector, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
};
use crate::controller::ManagedError;
use crate::crd::{Engine, Managed};
use crate::provider::{ClientFactory, SecretManager};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

/// Connects Engines to a fresh `SecretManager`
pub struct EngineConnector {
    credentials: Arc<dyn CredentialsSource>,
    factory: Arc<dyn ClientFactory>,
}

impl EngineConnector {
    pub fn new(credentials: Arc<dyn CredentialsSource>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            credentials,
            factory,
        }
    }
}

#[async_trait]
impl Connector<Engine> for EngineConnector {
    async fn connect(
        &self,
        resource: &Engine,
    ) -> Result<Box<dyn ExternalClient<Engine>>, ManagedError> {
        let credentials = self
            .credentials
            .credentials(resource.resource_spec().provider_config_name())
            .await?;
        let secrets = self
            .factory
            .secret_manager(&credentials)
            .map_err(ManagedError::NewClient)?;
        Ok(Box::new(EngineExternal::new(secrets)))
    }
}

/// Engine operations against a `SecretManager`
pub struct EngineExternal {
    secrets: Arc<dyn SecretManager>,
}

impl EngineExternal {
    pub fn new(secrets: Arc<dyn SecretManager>) -> Self {
        Self { secrets }
    }
}

#[async_trait]
impl ExternalClient<Engine> for EngineExternal {
    async fn observe(&self, resource: &Engine) -> Result<ExternalObservation, ManagedError> {
        let exists = self
            .secrets
            .exist_engine(&resource.name_any())
            .await
            .map_err(ManagedError::GettingEngine)?;

        // Mount options are not compared, so an engine is never stale
        Ok(ExternalObservation {
            resource_exists: exists,
            resource_up_to_date: true,
            ..ExternalObservation::default()
        })
    }

    async fn create(&self, resource: &Engine) -> Result<ExternalCreation, ManagedError> {
        let params = &resource.spec.for_provider;
        self.secrets
            .create_engine(&resource.name_any(), &params.storage, &params.options)
            .await
            .map_err(ManagedError::CreatingEngine)?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, _resource: &Engine) -> Result<ExternalUpdate, ManagedError> {
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, resource: &Engine) -> Result<(), ManagedError> {
        let name = resource.name_any();
        if !self.secrets.exist_engine(&name).await? {
            debug!(engine = %name, "Engine already unmounted");
            return Ok(());
        }
        self.secrets.delete_engine(&name).await?;
        Ok(())
    }
}
