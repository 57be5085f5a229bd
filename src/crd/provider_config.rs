//! # ProviderConfig
//!
//! Points managed resources at the Kubernetes Secret holding the Vault
//! address and token.

use serde::{Deserialize, Serialize};

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: secret.crossplane.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: vault-credentials
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "secret.crossplane.io",
    version = "v1alpha1",
    category = "crossplane",
    category = "provider",
    printcolumn = r#"{"name":"Secret-Name", "type":"string", "jsonPath":".spec.credentials.secretRef.name", "priority": 1}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    pub credentials: ProviderCredentials,
}

/// Where the Vault credentials come from
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Credentials source; only "Secret" is supported
    #[serde(default = "default_credentials_source")]
    pub source: String,
    /// Secret with the `host`, `port` and `token` keys
    #[serde(default)]
    pub secret_ref: Option<super::SecretReference>,
}

fn default_credentials_source() -> String {
    "Secret".to_string()
}
