//! # Vault Adapter Tests
//!
//! HTTP-level tests of the Vault `SecretManager` and `PolicyManager`
//! adapters against a mock server.

mod common;

use common::{init_rustls, rule};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use vault_provider::provider::vault::VaultClientFactory;
use vault_provider::provider::{
    ClientFactory, EngineOptions, PolicyManager, ProviderError, SecretData, SecretManager,
    VaultCredentials,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn credentials(server: &MockServer) -> VaultCredentials {
    VaultCredentials::new("http://127.0.0.1", server.address().port(), "root").unwrap()
}

fn secrets(server: &MockServer) -> Arc<dyn SecretManager> {
    init_rustls();
    VaultClientFactory::new(Duration::from_secs(5))
        .secret_manager(&credentials(server))
        .unwrap()
}

fn policies(server: &MockServer) -> Arc<dyn PolicyManager> {
    init_rustls();
    VaultClientFactory::new(Duration::from_secs(5))
        .policy_manager(&credentials(server))
        .unwrap()
}

fn kv_v1() -> EngineOptions {
    EngineOptions::from([("version".to_string(), "1".to_string())])
}

fn data(value: serde_json::Value) -> SecretData {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[tokio::test]
async fn test_exist_engine_maps_tune_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/mounts/team-a/tune"))
        .and(header("X-Vault-Token", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"default_lease_ttl": 0})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/mounts/missing/tune"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            json!({"errors": ["cannot fetch sysview for path \"missing/\""]}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/mounts/forbidden/tune"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})))
        .mount(&server)
        .await;

    let secrets = secrets(&server);
    assert!(secrets.exist_engine("team-a").await.unwrap());
    assert!(!secrets.exist_engine("missing").await.unwrap());
    let err = secrets.exist_engine("forbidden").await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 403, .. }), "{err}");
}

#[tokio::test]
async fn test_create_engine_posts_type_and_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/sys/mounts/team-a"))
        .and(body_json(json!({"type": "kv", "options": {"version": "2"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let options = EngineOptions::from([("version".to_string(), "2".to_string())]);
    secrets(&server)
        .create_engine("team-a", "kv", &options)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_kv_v2_put_wraps_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/team-a/data/db/creds"))
        .and(body_json(json!({"data": {"secret": "empty"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"version": 1}})))
        .expect(1)
        .mount(&server)
        .await;

    secrets(&server)
        .put(
            "team-a",
            "db/creds",
            &data(json!({"secret": "empty"})),
            &EngineOptions::new(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_kv_v1_put_sends_data_as_is() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/legacy/db/creds"))
        .and(body_json(json!({"secret": "empty"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    secrets(&server)
        .put("legacy", "db/creds", &data(json!({"secret": "empty"})), &kv_v1())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_kv_reads_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/team-a/data/present"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"data": {"data": {"password": "hunter2"}, "metadata": {"version": 3}}}),
        ))
        .mount(&server)
        .await;
    // Soft-deleted KV v2 versions come back with null data
    Mock::given(method("GET"))
        .and(path("/v1/team-a/data/deleted"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"data": {"data": null, "metadata": {"deletion_time": "2024-01-01T00:00:00Z"}}}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/team-a/data/absent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/legacy/present"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"user": "app"}})))
        .mount(&server)
        .await;

    let secrets = secrets(&server);
    let options = EngineOptions::new();
    assert_eq!(
        secrets.get_secrets("team-a", "present", &options).await.unwrap(),
        data(json!({"password": "hunter2"}))
    );
    assert!(secrets
        .get_secrets("team-a", "deleted", &options)
        .await
        .unwrap_err()
        .is_path_not_found());
    assert!(secrets
        .get_secrets("team-a", "absent", &options)
        .await
        .unwrap_err()
        .is_path_not_found());
    assert_eq!(
        secrets.get_secrets("legacy", "present", &kv_v1()).await.unwrap(),
        data(json!({"user": "app"}))
    );
}

#[tokio::test]
async fn test_delete_path_and_engine() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/team-a/data/db"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/team-a/data/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/sys/mounts/team-a"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let secrets = secrets(&server);
    let options = EngineOptions::new();
    secrets.delete_path("team-a", "db", &options).await.unwrap();
    assert!(secrets
        .delete_path("team-a", "gone", &options)
        .await
        .unwrap_err()
        .is_path_not_found());
    secrets.delete_engine("team-a").await.unwrap();
}

#[tokio::test]
async fn test_policy_get_parses_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "name": "readers",
                "policy": "# team a\npath \"secret/dev/*\" {\n  capabilities = [\"read\", \"list\"]\n}\n"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/empty"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"name": "empty", "policy": ""}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/absent"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;

    let policies = policies(&server);
    assert_eq!(
        policies.get("readers").await.unwrap(),
        vec![rule("secret/dev/*", &["read", "list"])]
    );
    assert!(policies.get("empty").await.unwrap_err().is_policy_not_found());
    assert!(policies.get("absent").await.unwrap_err().is_policy_not_found());
}

#[tokio::test]
async fn test_policy_put_keeps_other_rules() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"policy": "path \"/dev\" {\n  capabilities = [\"list\"]\n}\npath \"/stg\" {\n  capabilities = [\"read\"]\n}"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/readers"))
        .and(body_json(json!({
            "policy": vault_provider::provider::policy_document::render(&[
                rule("/dev", &["list", "read"]),
                rule("/stg", &["read"]),
            ])
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    policies(&server)
        .put("readers", &rule("/dev", &["list", "read"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_policy_put_creates_missing_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/new"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/new"))
        .and(body_json(json!({
            "policy": vault_provider::provider::policy_document::render(&[rule("/dev", &["read"])])
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    policies(&server)
        .put("new", &rule("/dev", &["read"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_policy_retain_deletes_policy_left_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"policy": "path \"/stg\" {\n  capabilities = [\"read\"]\n}"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    policies(&server)
        .retain("readers", &BTreeSet::from(["/dev".to_string()]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_policy_retain_without_changes_does_not_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"policy": "path \"/dev/*\" {\n  capabilities = [\"read\"]\n}"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    policies(&server)
        .retain("readers", &BTreeSet::from(["/dev/".to_string()]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_errors_carry_vault_messages() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/sys/policies/acl/readers"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})))
        .mount(&server)
        .await;

    let err = policies(&server).delete("readers").await.unwrap_err();
    assert_eq!(err.to_string(), "vault returned status 403: permission denied");
}
