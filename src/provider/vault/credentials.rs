//! Vault address and token resolved from a ProviderConfig Secret

use crate::constants::{CREDENTIALS_HOST_KEY, CREDENTIALS_PORT_KEY, CREDENTIALS_TOKEN_KEY};
use crate::provider::ProviderError;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

#[derive(Clone)]
pub struct VaultCredentials {
    address: String,
    token: Zeroizing<String>,
}

impl fmt::Debug for VaultCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultCredentials")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl VaultCredentials {
    /// Build credentials for `host:port`
    ///
    /// A host without a scheme is reached over `https://`.
    ///
    /// # Errors
    /// Returns `ProviderError::InvalidCredentials` if the host or token is empty.
    pub fn new(host: &str, port: u16, token: impl Into<String>) -> Result<Self, ProviderError> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(ProviderError::InvalidCredentials("host is empty".to_string()));
        }
        let token = Zeroizing::new(token.into());
        if token.trim().is_empty() {
            return Err(ProviderError::InvalidCredentials("token is empty".to_string()));
        }

        let address = if host.contains("://") {
            format!("{host}:{port}")
        } else {
            format!("https://{host}:{port}")
        };

        Ok(Self { address, token })
    }

    /// Read `host`, `port` and `token` from the data of a Kubernetes Secret
    ///
    /// # Errors
    /// Returns `ProviderError::InvalidCredentials` if a key is missing, is not
    /// UTF-8, or `port` is not a valid TCP port.
    pub fn from_secret_data<V: AsRef<[u8]>>(
        data: &BTreeMap<String, V>,
    ) -> Result<Self, ProviderError> {
        let host = required_str(data, CREDENTIALS_HOST_KEY)?;
        let port = required_str(data, CREDENTIALS_PORT_KEY)?;
        let port: u16 = port.trim().parse().map_err(|e| {
            ProviderError::InvalidCredentials(format!("port {port:?} is not a valid port: {e}"))
        })?;
        let token = Zeroizing::new(required_str(data, CREDENTIALS_TOKEN_KEY)?.to_string());

        Self::new(host, port, token.as_str())
    }

    /// Base URL of the Vault server, without the `/v1` API prefix
    pub fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

fn required_str<'a, V: AsRef<[u8]>>(
    data: &'a BTreeMap<String, V>,
    key: &str,
) -> Result<&'a str, ProviderError> {
    let value = data
        .get(key)
        .ok_or_else(|| ProviderError::InvalidCredentials(format!("missing key {key:?}")))?;
    std::str::from_utf8(value.as_ref())
        .map_err(|e| ProviderError::InvalidCredentials(format!("key {key:?} is not UTF-8: {e}")))
}
