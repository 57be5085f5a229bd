//! # Managed Resource Spec
//!
//! Fields shared by every managed resource spec, plus the `Managed` trait the
//! generic reconciler is parameterized over.

use super::ResourceStatus;
use k8s_openapi::ClusterResourceScope;
use kube::Resource;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

/// Common spec fields, flattened into each resource's `spec`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// ProviderConfig holding the Vault credentials
    /// Defaults to the ProviderConfig named "default"
    #[serde(default)]
    pub provider_config_ref: Option<ProviderConfigReference>,
    /// What happens to the Vault object when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
    /// Secret receiving connection details of the external resource (optional)
    #[serde(default)]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

impl ResourceSpec {
    /// Name of the ProviderConfig to connect with
    pub fn provider_config_name(&self) -> &str {
        self.provider_config_ref
            .as_ref()
            .map_or(crate::constants::DEFAULT_PROVIDER_CONFIG_NAME, |r| r.name.as_str())
    }
}

/// Reference to a cluster-scoped ProviderConfig
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
pub struct ProviderConfigReference {
    pub name: String,
}

/// Reference to a namespaced Secret
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

/// Deletion behaviour of a managed resource
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
pub enum DeletionPolicy {
    /// Remove the Vault object together with the resource (default)
    #[default]
    Delete,
    /// Leave the Vault object in place
    Orphan,
}

/// A cluster-scoped custom resource reconciled by the managed-resource driver
pub trait Managed:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn resource_spec(&self) -> &ResourceSpec;

    fn resource_status(&self) -> Option<&ResourceStatus>;
}

/// Implement `Managed` for a CRD whose spec flattens `ResourceSpec` into `resource`
macro_rules! impl_managed {
    ($kind:ty) => {
        impl $crate::crd::Managed for $kind {
            fn resource_spec(&self) -> &$crate::crd::ResourceSpec {
                &self.spec.resource
            }

            fn resource_status(&self) -> Option<&$crate::crd::ResourceStatus> {
                self.status.as_ref()
            }
        }
    };
}

pub(crate) use impl_managed;
