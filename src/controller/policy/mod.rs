//! # Policy Reconciler
//!
//! Keeps a Vault ACL policy in line with the rules of a Policy resource.
//!
//! Rules are written one at a time in spec order. A failed write stops the
//! pass and earlier writes stay in place; the next reconcile observes the
//! partial state and converges from there.

mod diff;

pub use diff::{ensure_unique_prefixes, index_by_prefix, is_up_to_date, prefixes};

use crate::controller::connector::CredentialsSource;
use crate::controller::managed::{
    Connector, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
};
use crate::controller::ManagedError;
use crate::crd::{Managed, Policy};
use crate::provider::{ClientFactory, PolicyManager, PolicyRule};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Rules requested by the resource, in spec order
pub fn desired_rules(resource: &Policy) -> Vec<PolicyRule> {
    resource
        .spec
        .for_provider
        .rules
        .iter()
        .map(|rule| PolicyRule::new(rule.path.clone(), rule.capabilities.iter().cloned()))
        .collect()
}

pub struct PolicyConnector {
    credentials: Arc<dyn CredentialsSource>,
    factory: Arc<dyn ClientFactory>,
}

impl PolicyConnector {
    pub fn new(credentials: Arc<dyn CredentialsSource>, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            credentials,
            factory,
        }
    }
}

#[async_trait]
impl Connector<Policy> for PolicyConnector {
    async fn connect(
        &self,
        resource: &Policy,
    ) -> Result<Box<dyn ExternalClient<Policy>>, ManagedError> {
        let credentials = self
            .credentials
            .credentials(resource.resource_spec().provider_config_name())
            .await?;
        let policies = self
            .factory
            .policy_manager(&credentials)
            .map_err(ManagedError::NewClient)?;
        Ok(Box::new(PolicyExternal::new(policies)))
    }
}

pub struct PolicyExternal {
    policies: Arc<dyn PolicyManager>,
}

impl PolicyExternal {
    pub fn new(policies: Arc<dyn PolicyManager>) -> Self {
        Self { policies }
    }

    /// Write every desired rule, stopping at the first failure
    async fn put_rules(&self, name: &str, rules: &[PolicyRule]) -> Result<(), ManagedError> {
        for (written, rule) in rules.iter().enumerate() {
            if let Err(error) = self.policies.put(name, rule).await {
                debug!(
                    written,
                    remaining = rules.len() - written,
                    "Stopping policy write at {}",
                    rule.path
                );
                return Err(error.into());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ExternalClient<Policy> for PolicyExternal {
    async fn observe(&self, resource: &Policy) -> Result<ExternalObservation, ManagedError> {
        let desired = desired_rules(resource);
        ensure_unique_prefixes(&desired)?;

        let observed = match self.policies.get(&resource.name_any()).await {
            Ok(rules) => rules,
            Err(e) if e.is_policy_not_found() => return Ok(ExternalObservation::absent()),
            Err(e) => return Err(ManagedError::GettingPolicy(e)),
        };

        Ok(ExternalObservation::exists(is_up_to_date(
            &desired, &observed,
        )))
    }

    async fn create(&self, resource: &Policy) -> Result<ExternalCreation, ManagedError> {
        let desired = desired_rules(resource);
        ensure_unique_prefixes(&desired)?;

        self.put_rules(&resource.name_any(), &desired).await?;
        Ok(ExternalCreation::default())
    }

    async fn update(&self, resource: &Policy) -> Result<ExternalUpdate, ManagedError> {
        let name = resource.name_any();
        let desired = desired_rules(resource);
        ensure_unique_prefixes(&desired)?;

        self.put_rules(&name, &desired).await?;
        self.policies.retain(&name, &prefixes(&desired)).await?;
        info!(rules = desired.len(), "Policy {name} brought up to date");
        Ok(ExternalUpdate::default())
    }

    async fn delete(&self, resource: &Policy) -> Result<(), ManagedError> {
        self.policies.delete(&resource.name_any()).await?;
        Ok(())
    }
}
