//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use vault_provider::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (Engine, SecretPath, Policy, ProviderConfig, etc.)
//! - Adapter traits (SecretManager, PolicyManager, ClientFactory)
//! - The managed-resource contract (ExternalClient, Connector)
//! - Config and error types

// CRD types - most commonly used
pub use crate::crd::*;

// Adapter traits - needed for implementing alternative backends
pub use crate::provider::{
    ClientFactory, PolicyManager, PolicyRule, ProviderError, SecretManager, VaultCredentials,
};

// Managed-resource contract and driver
pub use crate::controller::managed::{
    reconcile, Connector, ExternalClient, ExternalCreation, ExternalObservation, ExternalUpdate,
    ManagedReconciler,
};
pub use crate::controller::{ManagedError, ReconcilerError};

// Config types
pub use crate::config::ControllerConfig;
