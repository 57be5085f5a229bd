//! Secret engines and KV paths over the Vault HTTP API

use super::VaultClient;
use crate::provider::{EngineOptions, KvVersion, ProviderError, SecretData, SecretManager};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, info_span, Instrument};

/// `GET {mount}/{path}` on a KV v1 engine
#[derive(Debug, Deserialize)]
struct KvV1ReadResponse {
    #[serde(default)]
    data: SecretData,
}

/// `GET {mount}/data/{path}` on a KV v2 engine
#[derive(Debug, Deserialize)]
struct KvV2ReadResponse {
    data: KvV2Data,
}

/// A deleted or destroyed version comes back with `data: null`
#[derive(Debug, Deserialize)]
struct KvV2Data {
    #[serde(default)]
    data: Option<SecretData>,
}

#[derive(Debug, Clone)]
pub struct VaultSecretManager {
    client: VaultClient,
}

impl VaultSecretManager {
    pub fn new(client: VaultClient) -> Self {
        Self { client }
    }
}

fn mount(engine: &str) -> &str {
    engine.trim_matches('/')
}

/// API path of a secret for the given KV version
fn kv_path(version: KvVersion, engine: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    match version {
        KvVersion::V1 => format!("{}/{path}", mount(engine)),
        KvVersion::V2 => format!("{}/data/{path}", mount(engine)),
    }
}

fn path_not_found(engine: &str, path: &str) -> ProviderError {
    ProviderError::PathNotFound {
        engine: engine.to_string(),
        path: path.to_string(),
    }
}

#[async_trait]
impl SecretManager for VaultSecretManager {
    async fn put(
        &self,
        engine: &str,
        path: &str,
        data: &SecretData,
        options: &EngineOptions,
    ) -> Result<(), ProviderError> {
        let version = KvVersion::from_options(options);
        let span = info_span!("vault.kv.put", engine, path, kv.version = ?version);

        async move {
            let (operation, body) = match version {
                KvVersion::V1 => ("kv1.put", serde_json::Value::Object(data.clone())),
                KvVersion::V2 => ("kv2.put", serde_json::json!({ "data": data })),
            };

            let response = self
                .client
                .execute(operation, Method::POST, &kv_path(version, engine, path), Some(&body))
                .await?;
            response.check(operation)?;

            info!("Wrote secret {path} in engine {engine}");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn get_secrets(
        &self,
        engine: &str,
        path: &str,
        options: &EngineOptions,
    ) -> Result<SecretData, ProviderError> {
        let version = KvVersion::from_options(options);
        let span = tracing::debug_span!("vault.kv.get", engine, path, kv.version = ?version);

        async move {
            let operation = match version {
                KvVersion::V1 => "kv1.get",
                KvVersion::V2 => "kv2.get",
            };

            let response = self
                .client
                .execute(operation, Method::GET, &kv_path(version, engine, path), None)
                .await?;

            if response.status == StatusCode::NOT_FOUND {
                debug!("Secret {path} not found in engine {engine}");
                return Err(path_not_found(engine, path));
            }
            response.check(operation)?;

            match version {
                KvVersion::V1 => Ok(response.json::<KvV1ReadResponse>()?.data),
                KvVersion::V2 => response
                    .json::<KvV2ReadResponse>()?
                    .data
                    .data
                    .ok_or_else(|| path_not_found(engine, path)),
            }
        }
        .instrument(span)
        .await
    }

    async fn create_engine(
        &self,
        engine: &str,
        engine_type: &str,
        options: &EngineOptions,
    ) -> Result<(), ProviderError> {
        let span = info_span!("vault.mount.create", engine, engine_type);

        async move {
            let body = serde_json::json!({
                "type": engine_type,
                "options": options,
            });

            let response = self
                .client
                .execute(
                    "mount.create",
                    Method::POST,
                    &format!("sys/mounts/{}", mount(engine)),
                    Some(&body),
                )
                .await?;
            response.check("mount.create")?;

            info!("Mounted {engine_type} engine at {engine}");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn exist_engine(&self, engine: &str) -> Result<bool, ProviderError> {
        let span = tracing::debug_span!("vault.mount.exists", engine);

        async move {
            let response = self
                .client
                .execute(
                    "mount.exists",
                    Method::GET,
                    &format!("sys/mounts/{}/tune", mount(engine)),
                    None,
                )
                .await?;

            // Vault answers 400 "cannot fetch sysview" for unknown mounts
            match response.status {
                status if status.is_success() => Ok(true),
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => Ok(false),
                _ => Err(VaultClient::handle_error_response("mount.exists", &response)),
            }
        }
        .instrument(span)
        .await
    }

    async fn delete_path(
        &self,
        engine: &str,
        path: &str,
        options: &EngineOptions,
    ) -> Result<(), ProviderError> {
        let version = KvVersion::from_options(options);
        let span = info_span!("vault.kv.delete", engine, path, kv.version = ?version);

        async move {
            let operation = match version {
                KvVersion::V1 => "kv1.delete",
                KvVersion::V2 => "kv2.delete",
            };

            let response = self
                .client
                .execute(operation, Method::DELETE, &kv_path(version, engine, path), None)
                .await?;

            if response.status == StatusCode::NOT_FOUND {
                return Err(path_not_found(engine, path));
            }
            response.check(operation)?;

            info!("Deleted secret {path} in engine {engine}");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn delete_engine(&self, engine: &str) -> Result<(), ProviderError> {
        let span = info_span!("vault.mount.delete", engine);

        async move {
            let response = self
                .client
                .execute(
                    "mount.delete",
                    Method::DELETE,
                    &format!("sys/mounts/{}", mount(engine)),
                    None,
                )
                .await?;
            response.check("mount.delete")?;

            info!("Unmounted engine {engine}");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
