//! # Watch Loop
//!
//! One `Controller` per managed kind, all sharing the Kubernetes client and
//! stopping together on SIGTERM/SIGINT.

use crate::config::ControllerConfig;
use crate::controller::connector::{CredentialsSource, KubeCredentialsSource};
use crate::controller::engine::EngineConnector;
use crate::controller::managed::{reconcile, ManagedReconciler};
use crate::controller::owner::{KubeOwnerResolver, OwnerResolver};
use crate::controller::policy::PolicyConnector;
use crate::controller::secret_path::SecretPathConnector;
use crate::crd::{Engine, Managed, Policy, SecretPath};
use crate::provider::vault::VaultClientFactory;
use crate::provider::ClientFactory;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::initialization::InitializationResult;
use crate::server::ServerState;
use futures::StreamExt;
use kube::api::Api;
use kube::Client;
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the Engine, SecretPath and Policy controllers until shutdown
///
/// # Errors
/// Currently infallible once initialization succeeded; the `Result` leaves
/// room for start-up checks.
pub async fn run_watch_loop(init: InitializationResult) -> Result<(), anyhow::Error> {
    let InitializationResult {
        client,
        server_state,
        config,
    } = init;

    spawn_shutdown_handler(Arc::clone(&server_state));

    let credentials: Arc<dyn CredentialsSource> =
        Arc::new(KubeCredentialsSource::new(client.clone()));
    let factory: Arc<dyn ClientFactory> =
        Arc::new(VaultClientFactory::new(config.vault_request_timeout()));
    let owners: Arc<dyn OwnerResolver> = Arc::new(KubeOwnerResolver::new(client.clone()));

    let engines = ManagedReconciler::<Engine>::new(
        client.clone(),
        Arc::new(EngineConnector::new(
            Arc::clone(&credentials),
            Arc::clone(&factory),
        )),
        config.clone(),
    );
    let secret_paths = ManagedReconciler::<SecretPath>::new(
        client.clone(),
        Arc::new(SecretPathConnector::new(
            Arc::clone(&credentials),
            Arc::clone(&factory),
            owners,
        )),
        config.clone(),
    );
    let policies = ManagedReconciler::<Policy>::new(
        client.clone(),
        Arc::new(PolicyConnector::new(credentials, factory)),
        config.clone(),
    );

    info!("Starting controller watch loops...");
    futures::join!(
        run_controller(client.clone(), engines, &config),
        run_controller(client.clone(), secret_paths, &config),
        run_controller(client, policies, &config),
    );

    info!("Controller stopped gracefully");
    Ok(())
}

/// Mark the server as not ready as soon as a shutdown signal arrives
fn spawn_shutdown_handler(server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });
}

async fn run_controller<K: Managed>(
    client: Client,
    reconciler: ManagedReconciler<K>,
    config: &ControllerConfig,
) {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = Api::all(client);

    info!(resource.kind = %kind, "Watching resources");
    let reconciler = Arc::new(reconciler);
    let controller = Controller::new(api, watcher::Config::default().any_semantic())
        .with_config(controller::Config::default().concurrency(config.max_concurrent_reconciliations))
        .shutdown_on_signal();
    let store = controller.store();

    controller
        .run(
            |obj, ctx| reconcile(obj, ctx),
            |obj, error, ctx| handle_reconciliation_error(obj, error, ctx),
            Arc::clone(&reconciler),
        )
        .for_each(|result| {
            match result {
                Ok((obj, _action)) => debug!(resource.name = %obj.name, "reconciliation.success"),
                Err(e) => debug!(error = %e, "controller.event.error"),
            }
            // Objects deleted while failing never reconcile again
            reconciler.prune_backoff(|name| store.get(&ObjectRef::<K>::new(name)).is_some());
            futures::future::ready(())
        })
        .await;

    info!(resource.kind = %kind, "Controller loop ended");
}
