//! Errors returned by the Vault adapters

use super::policy_document::PolicyParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Nothing is stored at the requested path
    #[error("path {path} does not exist in engine {engine}")]
    PathNotFound { engine: String, path: String },

    /// The named ACL policy is absent or empty
    #[error("policy {0} not found")]
    PolicyNotFound(String),

    #[error("invalid vault credentials: {0}")]
    InvalidCredentials(String),

    #[error("vault request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("vault returned status {status}: {}", .errors.join("; "))]
    Api { status: u16, errors: Vec<String> },

    #[error("unexpected vault response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid policy document: {0}")]
    PolicyDocument(#[from] PolicyParseError),
}

impl ProviderError {
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }

    pub fn is_policy_not_found(&self) -> bool {
        matches!(self, Self::PolicyNotFound(_))
    }
}
