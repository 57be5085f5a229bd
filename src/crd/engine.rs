//! # Engine
//!
//! A secret engine mounted in Vault. The resource name is the mount path.

use super::{impl_managed, ResourceSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engine Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.secret.crossplane.io/v1alpha1
/// kind: Engine
/// metadata:
///   name: team-a
/// spec:
///   forProvider:
///     storage: kv
///     options:
///       version: "2"
///   providerConfigRef:
///     name: default
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Engine",
    group = "vault.secret.crossplane.io",
    version = "v1alpha1",
    status = "crate::crd::ResourceStatus",
    category = "crossplane",
    category = "managed",
    category = "secret",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EngineSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: EngineParameters,
}

/// Configurable fields of an Engine
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineParameters {
    /// Secret engine type to mount (e.g. "kv")
    pub storage: String,
    /// Mount options passed to Vault
    /// `version` selects the KV protocol ("1" or "2", default "2")
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl_managed!(Engine);
