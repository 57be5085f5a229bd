//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of the Vault managed resources (`Engine`, `SecretPath`, `Policy`)
pub const VAULT_API_GROUP: &str = "vault.secret.crossplane.io";

/// API group of the provider configuration resources
pub const PROVIDER_API_GROUP: &str = "secret.crossplane.io";

/// API version shared by every CRD served by this controller
pub const API_VERSION: &str = "v1alpha1";

/// Finalizer added to every managed resource so Vault objects are removed on delete
pub const MANAGED_FINALIZER: &str = "vault.secret.crossplane.io/managed";

/// Field manager used for server-side apply patches
pub const FIELD_MANAGER: &str = "vault-provider";

/// Name of the ProviderConfig used when a resource does not reference one
pub const DEFAULT_PROVIDER_CONFIG_NAME: &str = "default";

/// Option key selecting the KV engine version of a mount
pub const KV_VERSION_OPTION: &str = "version";

/// Keys expected in the credentials Secret referenced by a ProviderConfig
pub const CREDENTIALS_HOST_KEY: &str = "host";
pub const CREDENTIALS_PORT_KEY: &str = "port";
pub const CREDENTIALS_TOKEN_KEY: &str = "token";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default interval between two observations of an up-to-date resource (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Requeue used right after a create or update so the result is observed quickly (seconds)
pub const DEFAULT_SHORT_WAIT_SECS: u64 = 5;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default Fibonacci backoff bounds for failed reconciliations (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default timeout applied to each Vault HTTP request (seconds)
pub const DEFAULT_VAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of resources of one kind reconciled at the same time
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Type of the Secrets that receive a resource's connection details
pub const CONNECTION_SECRET_TYPE: &str = "connection.crossplane.io/v1alpha1";
