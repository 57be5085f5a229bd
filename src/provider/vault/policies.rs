//! ACL policies over the Vault HTTP API
//!
//! Vault stores a policy as one text document and `PUT` replaces it whole, so
//! writing a single rule reads the current document, swaps the rule with the
//! same prefix and writes the result back.

use super::VaultClient;
use crate::provider::policy_document::{self, PolicyRule};
use crate::provider::{PolicyManager, ProviderError};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info, info_span, Instrument};

/// `GET sys/policies/acl/{name}`
#[derive(Debug, Deserialize)]
struct ReadPolicyResponse {
    data: ReadPolicyData,
}

#[derive(Debug, Deserialize)]
struct ReadPolicyData {
    #[serde(default)]
    policy: String,
}

#[derive(Debug, Clone)]
pub struct VaultPolicyManager {
    client: VaultClient,
}

impl VaultPolicyManager {
    pub fn new(client: VaultClient) -> Self {
        Self { client }
    }

    fn policy_path(name: &str) -> String {
        format!("sys/policies/acl/{name}")
    }

    /// Replace the whole document of policy `name`
    async fn write(&self, name: &str, rules: &[PolicyRule]) -> Result<(), ProviderError> {
        let body = serde_json::json!({ "policy": policy_document::render(rules) });
        let response = self
            .client
            .execute("policy.put", Method::PUT, &Self::policy_path(name), Some(&body))
            .await?;
        response.check("policy.put")
    }

    /// Current rules, or `None` when the policy does not exist yet
    async fn current_rules(&self, name: &str) -> Result<Option<Vec<PolicyRule>>, ProviderError> {
        match self.get(name).await {
            Ok(rules) => Ok(Some(rules)),
            Err(e) if e.is_policy_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl PolicyManager for VaultPolicyManager {
    async fn put(&self, name: &str, rule: &PolicyRule) -> Result<(), ProviderError> {
        let span = info_span!("vault.policy.put", policy.name = name, rule.path = %rule.path);

        async move {
            let mut rules = self.current_rules(name).await?.unwrap_or_default();
            policy_document::upsert_rule(&mut rules, rule.clone());
            self.write(name, &rules).await?;

            info!("Wrote rule {} into policy {name}", rule.path);
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn get(&self, name: &str) -> Result<Vec<PolicyRule>, ProviderError> {
        let span = tracing::debug_span!("vault.policy.get", policy.name = name);

        async move {
            let response = self
                .client
                .execute("policy.get", Method::GET, &Self::policy_path(name), None)
                .await?;

            if response.status == StatusCode::NOT_FOUND {
                return Err(ProviderError::PolicyNotFound(name.to_string()));
            }
            response.check("policy.get")?;

            let text = response.json::<ReadPolicyResponse>()?.data.policy;
            if text.trim().is_empty() {
                return Err(ProviderError::PolicyNotFound(name.to_string()));
            }

            let rules = policy_document::parse(&text)?;
            debug!(rules = rules.len(), "Read policy {name}");
            Ok(rules)
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        let span = info_span!("vault.policy.delete", policy.name = name);

        async move {
            let response = self
                .client
                .execute("policy.delete", Method::DELETE, &Self::policy_path(name), None)
                .await?;
            response.check("policy.delete")?;

            info!("Deleted policy {name}");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn retain(&self, name: &str, prefixes: &BTreeSet<String>) -> Result<(), ProviderError> {
        let span = info_span!("vault.policy.retain", policy.name = name);

        async move {
            let Some(mut rules) = self.current_rules(name).await? else {
                return Ok(());
            };

            let before = rules.len();
            policy_document::retain_prefixes(&mut rules, prefixes);
            if rules.len() == before {
                return Ok(());
            }

            info!(
                removed = before - rules.len(),
                "Removing stale rules from policy {name}"
            );
            // Vault rejects an empty policy document
            if rules.is_empty() {
                return self.delete(name).await;
            }
            self.write(name, &rules).await
        }
        .instrument(span)
        .await
    }
}
