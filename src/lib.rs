//! Vault Provider Library
//!
//! Reconciles `Engine`, `SecretPath` and `Policy` resources against a
//! HashiCorp Vault server, with credentials taken from a `ProviderConfig`.
//! Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use vault_provider::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod server;
