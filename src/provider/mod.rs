//! # Provider Modules
//!
//! Adapters between the reconcilers and Vault.
//!
//! Reconcilers only see two traits:
//! - `SecretManager` for secret engines (mounts) and KV paths
//! - `PolicyManager` for ACL policies
//!
//! The `vault` module implements both over the Vault HTTP API. A
//! `ClientFactory` turns resolved credentials into fresh adapters on every
//! connect.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

mod error;
pub mod policy_document;
pub mod vault;

pub use error::ProviderError;
pub use policy_document::{PolicyParseError, PolicyRule};
pub use vault::VaultCredentials;

/// Key/value payload stored at a KV path
pub type SecretData = serde_json::Map<String, serde_json::Value>;

/// Options of a secret engine mount
pub type EngineOptions = BTreeMap<String, String>;

/// KV secrets engine protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvVersion {
    V1,
    V2,
}

impl KvVersion {
    /// `version = "1"` selects KV v1, anything else (including no option) KV v2
    pub fn from_options(options: &EngineOptions) -> Self {
        match options
            .get(crate::constants::KV_VERSION_OPTION)
            .map(|v| v.trim())
        {
            Some("1") => Self::V1,
            _ => Self::V2,
        }
    }
}

/// Secret engines and KV paths
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Write `data` at `path` inside the `engine` mount
    async fn put(
        &self,
        engine: &str,
        path: &str,
        data: &SecretData,
        options: &EngineOptions,
    ) -> Result<(), ProviderError>;

    /// Read the data stored at `path`
    ///
    /// Returns `ProviderError::PathNotFound` when nothing is stored there.
    async fn get_secrets(
        &self,
        engine: &str,
        path: &str,
        options: &EngineOptions,
    ) -> Result<SecretData, ProviderError>;

    /// Mount a secret engine of `engine_type` at `engine`
    async fn create_engine(
        &self,
        engine: &str,
        engine_type: &str,
        options: &EngineOptions,
    ) -> Result<(), ProviderError>;

    async fn exist_engine(&self, engine: &str) -> Result<bool, ProviderError>;

    async fn delete_path(
        &self,
        engine: &str,
        path: &str,
        options: &EngineOptions,
    ) -> Result<(), ProviderError>;

    /// Unmount the engine, destroying every secret it holds
    async fn delete_engine(&self, engine: &str) -> Result<(), ProviderError>;
}

/// Named ACL policies
#[async_trait]
pub trait PolicyManager: Send + Sync {
    /// Write one rule into the policy `name`, replacing the rule with the same prefix
    async fn put(&self, name: &str, rule: &PolicyRule) -> Result<(), ProviderError>;

    /// Read the rules of policy `name`
    ///
    /// Returns `ProviderError::PolicyNotFound` when the policy is absent or empty.
    async fn get(&self, name: &str) -> Result<Vec<PolicyRule>, ProviderError>;

    async fn delete(&self, name: &str) -> Result<(), ProviderError>;

    /// Remove every rule of policy `name` whose prefix is not in `prefixes`
    async fn retain(&self, name: &str, prefixes: &BTreeSet<String>) -> Result<(), ProviderError>;
}

/// Builds adapters from resolved credentials
pub trait ClientFactory: Send + Sync {
    /// Adapter for engines and KV paths
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    fn secret_manager(
        &self,
        credentials: &VaultCredentials,
    ) -> Result<Arc<dyn SecretManager>, ProviderError>;

    /// Adapter for ACL policies
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    fn policy_manager(
        &self,
        credentials: &VaultCredentials,
    ) -> Result<Arc<dyn PolicyManager>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> EngineOptions {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_kv_version_from_options() {
        assert_eq!(KvVersion::from_options(&options(&[("version", "1")])), KvVersion::V1);
        assert_eq!(KvVersion::from_options(&options(&[("version", "2")])), KvVersion::V2);
        assert_eq!(KvVersion::from_options(&options(&[])), KvVersion::V2);
        assert_eq!(
            KvVersion::from_options(&options(&[("version", "v1")])),
            KvVersion::V2
        );
    }
}
