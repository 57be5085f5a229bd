//! # Custom Resource Definitions
//!
//! CRD types served by the controller.
//!
//! ## Module Structure
//!
//! - `managed.rs` - Spec fields shared by every managed resource and the `Managed` trait
//! - `status.rs` - Status and condition types
//! - `engine.rs`, `secret_path.rs`, `policy.rs` - Vault managed resources
//! - `provider_config.rs` - Credentials reference used by Connect

mod engine;
mod managed;
mod policy;
mod provider_config;
mod secret_path;
mod status;

pub(crate) use managed::impl_managed;

// Re-export all public types
pub use engine::{Engine, EngineParameters, EngineSpec};
pub use managed::{DeletionPolicy, Managed, ProviderConfigReference, ResourceSpec, SecretReference};
pub use policy::{Policy, PolicyParameters, PolicySpec, Rule};
pub use provider_config::{ProviderConfig, ProviderConfigSpec, ProviderCredentials};
pub use secret_path::{SecretPath, SecretPathParameters, SecretPathSpec};
pub use status::{Condition, ResourceStatus, CONDITION_READY, CONDITION_SYNCED};
