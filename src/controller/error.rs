//! Errors raised while reconciling managed resources

use crate::provider::ProviderError;
use kube_runtime::finalizer;
use thiserror::Error;

/// Failure of a Connect or of an external observe/create/update/delete
#[derive(Debug, Error)]
pub enum ManagedError {
    #[error("cannot get ProviderConfig {name}: {source}")]
    GetProviderConfig {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("ProviderConfig {0} does not reference a credentials secret")]
    NoSecretRef(String),

    #[error("cannot get credentials secret {namespace}/{name}: {source}")]
    GetSecret {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("cannot create new client: {0}")]
    NewClient(#[source] ProviderError),

    /// The Engine a SecretPath points at cannot be resolved
    #[error("CR does not have parent ref")]
    NoOwnerReference,

    #[error("engine {0} not found")]
    EngineNotFound(String),

    #[error("cannot get path given a engine: {0}")]
    GettingEngine(#[source] ProviderError),

    #[error("creation engine error: {0}")]
    CreatingEngine(#[source] ProviderError),

    #[error("cannot get data from path: {0}")]
    ReadingPath(#[source] ProviderError),

    #[error("error during path creation: {0}")]
    CreatingPath(#[source] ProviderError),

    #[error("cannot get policy: {0}")]
    GettingPolicy(#[source] ProviderError),

    /// Two desired rules reduce to the same path prefix
    #[error("rules {first:?} and {second:?} share the path prefix {prefix:?}")]
    DuplicateRulePrefix {
        prefix: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Error returned to the controller runtime by `reconcile`
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("reconcile failed: {0}")]
    Finalizer(#[source] Box<finalizer::Error<ManagedError>>),
}

impl From<finalizer::Error<ManagedError>> for ReconcilerError {
    fn from(error: finalizer::Error<ManagedError>) -> Self {
        Self::Finalizer(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_the_vault_cause() {
        let err = ManagedError::CreatingPath(ProviderError::Api {
            status: 403,
            errors: vec!["permission denied".to_string()],
        });
        assert_eq!(
            err.to_string(),
            "error during path creation: vault returned status 403: permission denied"
        );
    }

    #[test]
    fn test_provider_errors_convert_transparently() {
        let err: ManagedError = ProviderError::PolicyNotFound("ops".to_string()).into();
        assert_eq!(err.to_string(), "policy ops not found");
    }
}
