//! # Policy
//!
//! A Vault ACL policy built from path rules. The resource name is the policy name.

use super::{impl_managed, ResourceSpec};
use serde::{Deserialize, Serialize};

/// Policy Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: vault.secret.crossplane.io/v1alpha1
/// kind: Policy
/// metadata:
///   name: team-a-readers
/// spec:
///   forProvider:
///     rules:
///       - path: "team-a/*"
///         capabilities: ["read", "list"]
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[kube(
    kind = "Policy",
    group = "vault.secret.crossplane.io",
    version = "v1alpha1",
    status = "crate::crd::ResourceStatus",
    category = "crossplane",
    category = "managed",
    category = "secret",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: PolicyParameters,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyParameters {
    /// Ordered rules; each one becomes a `path` block of the policy
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A path rule; a trailing `*` makes the rule apply to every path with that prefix
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub path: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl_managed!(Policy);
