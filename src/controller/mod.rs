//! # Controller
//!
//! Reconcilers for the Vault managed resources.
//!
//! - `managed`: Generic driver and the `ExternalClient`/`Connector` contract
//! - `connector`: Resolves Vault credentials from a ProviderConfig
//! - `owner`: Resolves the Engine a SecretPath belongs to
//! - `engine`, `secret_path`, `policy`: Per-kind external clients
//! - `backoff`: Fibonacci backoff mechanism for retries

pub mod backoff;
pub mod connector;
pub mod engine;
mod error;
pub mod managed;
pub mod owner;
pub mod policy;
pub mod secret_path;

pub use error::{ManagedError, ReconcilerError};
