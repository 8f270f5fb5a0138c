use anyhow::{Context, Result};
use fuse_broker_orchestrations::k8s_client::KubeClusterClient;
use fuse_broker_orchestrations::registry::create_deployer_registry;
use std::sync::Arc;

use crate::api::{self, AppState};
use crate::config::Config;

/// Run the broker API until the process is stopped
pub async fn run_server(port: Option<u16>) -> Result<()> {
    let config = Config::load()?;
    let port = port.unwrap_or(config.server_port);

    tracing::info!("Starting Fuse broker");
    tracing::info!("  Broker namespace: {}", config.broker_namespace);
    tracing::info!(
        "  Route suffix: {}",
        config.route_suffix.as_deref().unwrap_or("<none>")
    );

    let cluster = KubeClusterClient::try_default()
        .await
        .context("Failed to connect to the cluster")?;
    tracing::info!("✓ Connected to cluster");

    let registry = create_deployer_registry(&config.deployer_id, config.deployer_config());
    tracing::info!("✓ Registered {} deployer(s)", registry.len());

    let state = AppState {
        registry,
        cluster: Arc::new(cluster),
        broker_namespace: config.broker_namespace.clone(),
    };

    api::start_server(&config.server_host, port, state).await
}
