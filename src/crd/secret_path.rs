//! # SecretPath
//!
//! A key inside an Engine's mount. Only the presence of the path is managed,
//! never its content.

use super::{impl_managed, ResourceSpec};
use serde::{Deserialize, Serialize};

/// SecretPath Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.secret.crossplane.io/v1alpha1
/// kind: SecretPath
/// metadata:
///   name: team-a-database
/// spec:
///   forProvider:
///     engine: team-a
///     path: database/credentials
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "SecretPath",
    group = "vault.secret.crossplane.io",
    version = "v1alpha1",
    status = "crate::crd::ResourceStatus",
    category = "crossplane",
    category = "managed",
    category = "secret",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Engine", "type":"string", "jsonPath":".spec.forProvider.engine"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SecretPathSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: SecretPathParameters,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretPathParameters {
    /// Path of the secret inside the engine mount
    pub path: String,
    /// Name of the owning Engine resource
    pub engine: String,
}

impl_managed!(SecretPath);
