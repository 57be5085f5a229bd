//! # Vault Provider
//!
//! Kubernetes controller that mounts Vault secret engines, creates KV paths
//! and keeps ACL policies in sync with `Engine`, `SecretPath` and `Policy`
//! resources.
//!
//! Configuration is read from environment variables, see
//! [`ControllerConfig`](vault_provider::config::ControllerConfig).

use anyhow::Result;
use vault_provider::config::ControllerConfig;
use vault_provider::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize(ControllerConfig::from_env()).await?;
    run_watch_loop(init).await
}
