//! # Vault HTTP Adapters
//!
//! REST implementation of `SecretManager` and `PolicyManager` against the
//! Vault HTTP API (`/v1/...`), authenticated with the `X-Vault-Token` header.
//!
//! References:
//! - [Vault HTTP API](https://developer.hashicorp.com/vault/api-docs)

mod credentials;
mod policies;
mod secrets;

pub use credentials::VaultCredentials;
pub use policies::VaultPolicyManager;
pub use secrets::VaultSecretManager;

use crate::observability::metrics;
use crate::provider::{ClientFactory, PolicyManager, ProviderError, SecretManager};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use zeroize::Zeroizing;

/// Header carrying the Vault token
const TOKEN_HEADER: &str = "X-Vault-Token";

/// Error body returned by Vault for non-2xx responses
#[derive(Debug, Deserialize)]
struct VaultErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Status and raw body of a completed Vault request
#[derive(Debug)]
pub(crate) struct VaultResponse {
    status: StatusCode,
    body: String,
}

impl VaultResponse {
    fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `Ok` for 2xx, `ProviderError::Api` otherwise
    fn check(&self, operation: &str) -> Result<(), ProviderError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(VaultClient::handle_error_response(operation, self))
        }
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, ProviderError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Thin authenticated HTTP client shared by the Vault adapters
#[derive(Clone)]
pub struct VaultClient {
    http_client: Client,
    base_url: String,
    token: Arc<Zeroizing<String>>,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Create a client for the Vault server described by `credentials`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(credentials: &VaultCredentials, timeout: Duration) -> Result<Self, ProviderError> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: credentials.address().to_string(),
            token: Arc::new(Zeroizing::new(credentials.token().to_string())),
        })
    }

    /// Build an authenticated request against `/v1/{path}`
    fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .http_client
            .request(method, &url)
            .header(TOKEN_HEADER, self.token.as_str());

        if let Some(body) = body {
            request = request.json(body);
        }

        request
    }

    /// Send a request and collect status and body
    ///
    /// Transport failures are errors; HTTP error statuses are returned to the
    /// caller, which decides which of them mean "not found".
    async fn execute(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<VaultResponse, ProviderError> {
        let start = Instant::now();

        let response = match self.make_request(method.clone(), path, body).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::increment_vault_request_errors(operation);
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.text().await?;
        metrics::record_vault_request(operation, start.elapsed().as_secs_f64());
        debug!(
            operation,
            method = %method,
            path,
            status = status.as_u16(),
            "Vault request completed"
        );

        Ok(VaultResponse { status, body })
    }

    /// Turn a non-success response into `ProviderError::Api`
    fn handle_error_response(operation: &str, response: &VaultResponse) -> ProviderError {
        metrics::increment_vault_request_errors(operation);

        let errors = match serde_json::from_str::<VaultErrorResponse>(&response.body) {
            Ok(parsed) => parsed.errors,
            Err(_) if response.body.trim().is_empty() => Vec::new(),
            Err(_) => vec![response.body.trim().to_string()],
        };

        ProviderError::Api {
            status: response.status.as_u16(),
            errors,
        }
    }
}

/// Builds HTTP adapters with a fixed per-request timeout
#[derive(Debug, Clone)]
pub struct VaultClientFactory {
    request_timeout: Duration,
}

impl VaultClientFactory {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

impl ClientFactory for VaultClientFactory {
    fn secret_manager(
        &self,
        credentials: &VaultCredentials,
    ) -> Result<Arc<dyn SecretManager>, ProviderError> {
        let client = VaultClient::new(credentials, self.request_timeout)?;
        Ok(Arc::new(VaultSecretManager::new(client)))
    }

    fn policy_manager(
        &self,
        credentials: &VaultCredentials,
    ) -> Result<Arc<dyn PolicyManager>, ProviderError> {
        let client = VaultClient::new(credentials, self.request_timeout)?;
        Ok(Arc::new(VaultPolicyManager::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> VaultResponse {
        VaultResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_error_response_uses_vault_errors_array() {
        let err = VaultClient::handle_error_response(
            "mount.create",
            &response(400, r#"{"errors":["path is already in use at kv/"]}"#),
        );
        match err {
            ProviderError::Api { status, errors } => {
                assert_eq!(status, 400);
                assert_eq!(errors, vec!["path is already in use at kv/".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_response_falls_back_to_raw_body() {
        let err = VaultClient::handle_error_response("policy.put", &response(502, "bad gateway"));
        assert_eq!(err.to_string(), "vault returned status 502: bad gateway");
    }

    #[test]
    fn test_debug_hides_token() {
        let credentials = VaultCredentials::new("vault", 8200, "s.token").unwrap();
        let client = VaultClient::new(&credentials, Duration::from_secs(1)).unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("https://vault:8200"));
        assert!(!rendered.contains("s.token"));
    }
}
