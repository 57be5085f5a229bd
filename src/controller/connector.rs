//! # Connect
//!
//! Turns a resource's `providerConfigRef` into Vault credentials:
//! ProviderConfig, then its credentials Secret, then `VaultCredentials`.

use crate::controller::ManagedError;
use crate::crd::{ProviderConfig, SecretReference};
use crate::provider::VaultCredentials;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

/// Source of the credentials a Connect uses
#[async_trait]
pub trait CredentialsSource: Send + Sync {
    /// Credentials referenced by the ProviderConfig named `provider_config`
    async fn credentials(&self, provider_config: &str) -> Result<VaultCredentials, ManagedError>;
}

/// Reads ProviderConfigs and Secrets from the cluster
#[derive(Clone)]
pub struct KubeCredentialsSource {
    client: Client,
}

impl KubeCredentialsSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialsSource for KubeCredentialsSource {
    async fn credentials(&self, provider_config: &str) -> Result<VaultCredentials, ManagedError> {
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let config = configs
            .get(provider_config)
            .await
            .map_err(|source| ManagedError::GetProviderConfig {
                name: provider_config.to_string(),
                source,
            })?;

        let secret_ref = secret_ref(&config)?;
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &secret_ref.namespace);
        let secret = secrets
            .get(&secret_ref.name)
            .await
            .map_err(|source| ManagedError::GetSecret {
                namespace: secret_ref.namespace.clone(),
                name: secret_ref.name.clone(),
                source,
            })?;

        debug!(
            provider_config,
            secret.namespace = %secret_ref.namespace,
            secret.name = %secret_ref.name,
            "Resolved Vault credentials"
        );
        credentials_from_secret(&secret)
    }
}

/// Secret referenced by a ProviderConfig
///
/// # Errors
/// `NoSecretRef` when the ProviderConfig has no `credentials.secretRef`.
pub fn secret_ref(config: &ProviderConfig) -> Result<&SecretReference, ManagedError> {
    config
        .spec
        .credentials
        .secret_ref
        .as_ref()
        .ok_or_else(|| ManagedError::NoSecretRef(kube::ResourceExt::name_any(config)))
}

/// Build credentials from the `host`, `port` and `token` keys of a Secret
///
/// # Errors
/// `NewClient` when a key is missing or malformed.
pub fn credentials_from_secret(secret: &Secret) -> Result<VaultCredentials, ManagedError> {
    let data: BTreeMap<String, Vec<u8>> = secret
        .data
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), v.0.clone()))
        .chain(
            secret
                .string_data
                .iter()
                .flatten()
                .map(|(k, v)| (k.clone(), v.clone().into_bytes())),
        )
        .collect();

    VaultCredentials::from_secret_data(&data).map_err(ManagedError::NewClient)
}
