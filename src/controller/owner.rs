//! Resolves the Engine a SecretPath is stored in

use crate::controller::ManagedError;
use crate::crd::Engine;
use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};
use tracing::debug;

#[async_trait]
pub trait OwnerResolver: Send + Sync {
    /// The Engine resource called `name`
    ///
    /// Returns `ManagedError::NoOwnerReference` when it cannot be resolved.
    async fn engine(&self, name: &str) -> Result<Engine, ManagedError>;
}

/// Looks Engines up through the Kubernetes API
#[derive(Clone)]
pub struct KubeOwnerResolver {
    client: Client,
}

impl KubeOwnerResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnerResolver for KubeOwnerResolver {
    async fn engine(&self, name: &str) -> Result<Engine, ManagedError> {
        let engines: Api<Engine> = Api::all(self.client.clone());
        match engines.get_opt(name).await {
            Ok(Some(engine)) if engine.name_any() == name => Ok(engine),
            Ok(_) => Err(ManagedError::NoOwnerReference),
            Err(error) => {
                debug!(engine = name, error = %error, "Engine lookup failed");
                Err(ManagedError::NoOwnerReference)
            }
        }
    }
}
