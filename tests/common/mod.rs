//! Common test utilities
//!
//! In-memory `SecretManager` and `PolicyManager` fakes, plus the credentials,
//! factory and owner stubs the connectors need.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, Once};
use vault_provider::controller::connector::CredentialsSource;
use vault_provider::controller::owner::OwnerResolver;
use vault_provider::controller::ManagedError;
use vault_provider::crd::{
    Engine, EngineParameters, EngineSpec, Policy, PolicyParameters, PolicySpec,
    ResourceSpec, Rule, SecretPath, SecretPathParameters, SecretPathSpec,
};
use vault_provider::provider::policy_document;
use vault_provider::provider::{
    ClientFactory, EngineOptions, PolicyManager, PolicyRule, ProviderError, SecretData,
    SecretManager, VaultCredentials,
};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

pub fn vault_error(status: u16, message: &str) -> ProviderError {
    ProviderError::Api {
        status,
        errors: vec![message.to_string()],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mount {
    pub engine_type: String,
    pub options: EngineOptions,
}

/// Injected failure of one `SecretManager` operation
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    Status(u16),
}

#[derive(Debug, Default)]
struct SecretState {
    mounts: BTreeMap<String, Mount>,
    paths: BTreeMap<(String, String), SecretData>,
    calls: Vec<String>,
    failures: BTreeMap<&'static str, Failure>,
}

/// Vault mounts and KV paths held in memory
#[derive(Debug, Default)]
pub struct FakeSecretManager {
    state: Mutex<SecretState>,
}

impl FakeSecretManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call of `operation` fail
    pub fn fail(&self, operation: &'static str, failure: Failure) {
        self.state.lock().unwrap().failures.insert(operation, failure);
    }

    pub fn mount(&self, engine: &str, engine_type: &str) {
        self.state.lock().unwrap().mounts.insert(
            engine.to_string(),
            Mount {
                engine_type: engine_type.to_string(),
                options: EngineOptions::new(),
            },
        );
    }

    pub fn mounts(&self) -> BTreeMap<String, Mount> {
        self.state.lock().unwrap().mounts.clone()
    }

    pub fn secret(&self, engine: &str, path: &str) -> Option<SecretData> {
        self.state
            .lock()
            .unwrap()
            .paths
            .get(&(engine.to_string(), path.to_string()))
            .cloned()
    }

    pub fn insert_secret(&self, engine: &str, path: &str, data: SecretData) {
        self.state
            .lock()
            .unwrap()
            .paths
            .insert((engine.to_string(), path.to_string()), data);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(
        &self,
        operation: &'static str,
        engine: &str,
        path: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(match path {
            Some(path) => format!("{operation} {engine}/{path}"),
            None => format!("{operation} {engine}"),
        });
        match state.failures.get(operation) {
            Some(Failure::NotFound) => Err(ProviderError::PathNotFound {
                engine: engine.to_string(),
                path: path.unwrap_or_default().to_string(),
            }),
            Some(Failure::Status(status)) => Err(vault_error(*status, "injected failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SecretManager for FakeSecretManager {
    async fn put(
        &self,
        engine: &str,
        path: &str,
        data: &SecretData,
        _options: &EngineOptions,
    ) -> Result<(), ProviderError> {
        self.record("put", engine, Some(path))?;
        self.insert_secret(engine, path, data.clone());
        Ok(())
    }

    async fn get_secrets(
        &self,
        engine: &str,
        path: &str,
        _options: &EngineOptions,
    ) -> Result<SecretData, ProviderError> {
        self.record("get_secrets", engine, Some(path))?;
        self.secret(engine, path)
            .ok_or_else(|| ProviderError::PathNotFound {
                engine: engine.to_string(),
                path: path.to_string(),
            })
    }

    async fn create_engine(
        &self,
        engine: &str,
        engine_type: &str,
        options: &EngineOptions,
    ) -> Result<(), ProviderError> {
        self.record("create_engine", engine, None)?;
        self.state.lock().unwrap().mounts.insert(
            engine.to_string(),
            Mount {
                engine_type: engine_type.to_string(),
                options: options.clone(),
            },
        );
        Ok(())
    }

    async fn exist_engine(&self, engine: &str) -> Result<bool, ProviderError> {
        self.record("exist_engine", engine, None)?;
        Ok(self.state.lock().unwrap().mounts.contains_key(engine))
    }

    async fn delete_path(
        &self,
        engine: &str,
        path: &str,
        _options: &EngineOptions,
    ) -> Result<(), ProviderError> {
        self.record("delete_path", engine, Some(path))?;
        let removed = self
            .state
            .lock()
            .unwrap()
            .paths
            .remove(&(engine.to_string(), path.to_string()));
        match removed {
            Some(_) => Ok(()),
            None => Err(ProviderError::PathNotFound {
                engine: engine.to_string(),
                path: path.to_string(),
            }),
        }
    }

    async fn delete_engine(&self, engine: &str) -> Result<(), ProviderError> {
        self.record("delete_engine", engine, None)?;
        let mut state = self.state.lock().unwrap();
        state.mounts.remove(engine);
        state.paths.retain(|(mount, _), _| mount != engine);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PolicyState {
    policies: BTreeMap<String, Vec<PolicyRule>>,
    calls: Vec<String>,
    fail_put_on: Option<String>,
    fail_get: Option<u16>,
}

/// ACL policies held in memory, with the same per-rule upsert semantics as Vault
#[derive(Debug, Default)]
pub struct FakePolicyManager {
    state: Mutex<PolicyState>,
}

impl FakePolicyManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_policy(name: &str, rules: Vec<PolicyRule>) -> Arc<Self> {
        let fake = Self::default();
        fake.state
            .lock()
            .unwrap()
            .policies
            .insert(name.to_string(), rules);
        Arc::new(fake)
    }

    /// Fail the `put` of the rule whose path is `path`
    pub fn fail_put_on(&self, path: &str) {
        self.state.lock().unwrap().fail_put_on = Some(path.to_string());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_put_on = None;
        state.fail_get = None;
    }

    pub fn fail_get(&self, status: u16) {
        self.state.lock().unwrap().fail_get = Some(status);
    }

    pub fn policy(&self, name: &str) -> Option<Vec<PolicyRule>> {
        self.state.lock().unwrap().policies.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl PolicyManager for FakePolicyManager {
    async fn put(&self, name: &str, rule: &PolicyRule) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("put {name} {}", rule.path));
        if state.fail_put_on.as_deref() == Some(rule.path.as_str()) {
            return Err(vault_error(500, "internal error"));
        }
        let rules = state.policies.entry(name.to_string()).or_default();
        policy_document::upsert_rule(rules, rule.clone());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<PolicyRule>, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get {name}"));
        if let Some(status) = state.fail_get {
            return Err(vault_error(status, "permission denied"));
        }
        match state.policies.get(name) {
            Some(rules) if !rules.is_empty() => Ok(rules.clone()),
            _ => Err(ProviderError::PolicyNotFound(name.to_string())),
        }
    }

    async fn delete(&self, name: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete {name}"));
        state.policies.remove(name);
        Ok(())
    }

    async fn retain(&self, name: &str, prefixes: &BTreeSet<String>) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("retain {name}"));
        if let Some(rules) = state.policies.get_mut(name) {
            policy_document::retain_prefixes(rules, prefixes);
            if rules.is_empty() {
                state.policies.remove(name);
            }
        }
        Ok(())
    }
}

/// Hands out the same fakes on every connect
pub struct FakeFactory {
    pub secrets: Arc<FakeSecretManager>,
    pub policies: Arc<FakePolicyManager>,
}

impl FakeFactory {
    pub fn new(secrets: Arc<FakeSecretManager>, policies: Arc<FakePolicyManager>) -> Arc<Self> {
        Arc::new(Self { secrets, policies })
    }
}

impl ClientFactory for FakeFactory {
    fn secret_manager(
        &self,
        _credentials: &VaultCredentials,
    ) -> Result<Arc<dyn SecretManager>, ProviderError> {
        Ok(Arc::clone(&self.secrets) as Arc<dyn SecretManager>)
    }

    fn policy_manager(
        &self,
        _credentials: &VaultCredentials,
    ) -> Result<Arc<dyn PolicyManager>, ProviderError> {
        Ok(Arc::clone(&self.policies) as Arc<dyn PolicyManager>)
    }
}

/// Credentials for every ProviderConfig except the ones listed as missing
#[derive(Default)]
pub struct StaticCredentials {
    pub missing: BTreeSet<String>,
}

impl StaticCredentials {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CredentialsSource for StaticCredentials {
    async fn credentials(&self, provider_config: &str) -> Result<VaultCredentials, ManagedError> {
        if self.missing.contains(provider_config) {
            return Err(ManagedError::NoSecretRef(provider_config.to_string()));
        }
        VaultCredentials::new("http://vault", 8200, "root").map_err(ManagedError::NewClient)
    }
}

/// Engines known to the owner lookup
#[derive(Default)]
pub struct StaticOwners {
    engines: Mutex<BTreeMap<String, Engine>>,
}

impl StaticOwners {
    pub fn with(engines: Vec<Engine>) -> Arc<Self> {
        let owners = Self::default();
        {
            let mut map = owners.engines.lock().unwrap();
            for engine in engines {
                map.insert(engine.metadata.name.clone().unwrap_or_default(), engine);
            }
        }
        Arc::new(owners)
    }

    pub fn remove(&self, name: &str) {
        self.engines.lock().unwrap().remove(name);
    }
}

#[async_trait]
impl OwnerResolver for StaticOwners {
    async fn engine(&self, name: &str) -> Result<Engine, ManagedError> {
        self.engines
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(ManagedError::NoOwnerReference)
    }
}

pub fn engine(name: &str, storage: &str, options: &[(&str, &str)]) -> Engine {
    Engine::new(
        name,
        EngineSpec {
            resource: ResourceSpec::default(),
            for_provider: EngineParameters {
                storage: storage.to_string(),
                options: options
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            },
        },
    )
}

pub fn secret_path(name: &str, engine: &str, path: &str) -> SecretPath {
    SecretPath::new(
        name,
        SecretPathSpec {
            resource: ResourceSpec::default(),
            for_provider: SecretPathParameters {
                path: path.to_string(),
                engine: engine.to_string(),
            },
        },
    )
}

pub fn policy(name: &str, rules: &[(&str, &[&str])]) -> Policy {
    Policy::new(
        name,
        PolicySpec {
            resource: ResourceSpec::default(),
            for_provider: PolicyParameters {
                rules: rules
                    .iter()
                    .map(|(path, capabilities)| Rule {
                        path: (*path).to_string(),
                        capabilities: capabilities.iter().map(|c| (*c).to_string()).collect(),
                    })
                    .collect(),
            },
        },
    )
}

pub fn rule(path: &str, capabilities: &[&str]) -> PolicyRule {
    PolicyRule::new(path, capabilities.iter().copied())
}
