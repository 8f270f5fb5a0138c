use anyhow::{Context, Result};
use fuse_broker_models::{ContextProfile, UserInfo};
use fuse_broker_orchestrations::k8s_client::{describe_error, KubeClusterClient};
use fuse_broker_orchestrations::registry::create_deployer_registry;
use fuse_broker_orchestrations::{names, Deployer};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::Config;

struct Session {
    config: Config,
    cluster: KubeClusterClient,
    deployer: Arc<dyn Deployer>,
}

async fn connect() -> Result<Session> {
    let config = Config::load()?;
    let cluster = KubeClusterClient::try_default()
        .await
        .context("Failed to connect to the cluster")?;
    let deployer = create_deployer_registry(&config.deployer_id, config.deployer_config())
        .find(names::SERVICE_ID)
        .context("No deployer registered for the fuse service")?;

    Ok(Session {
        config,
        cluster,
        deployer,
    })
}

pub async fn run_deploy(
    instance_id: String,
    user: String,
    namespace: String,
    limit: Option<u32>,
) -> Result<()> {
    let session = connect().await?;

    let context = ContextProfile {
        platform: "kubernetes".to_string(),
        namespace,
    };
    let mut parameters = Map::new();
    if let Some(limit) = limit {
        parameters.insert("limit".to_string(), Value::from(limit));
    }
    let user = UserInfo {
        username: user,
        ..Default::default()
    };

    println!("Deploying fuse instance '{}'...", instance_id);

    let response = session
        .deployer
        .deploy(
            &instance_id,
            &session.config.broker_namespace,
            &context,
            &parameters,
            &user,
            &session.cluster,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Deploy failed ({}): {}", e.code, e))?;

    println!("✓ Provisioning started");
    println!("  Namespace: {}", names::instance_namespace(&instance_id));
    if let Some(url) = &response.dashboard_url {
        println!("  Dashboard: {}", url);
    }
    println!();
    println!("Check progress with: fuse-broker-server status {}", instance_id);

    Ok(())
}

pub async fn run_remove(instance_id: String) -> Result<()> {
    let session = connect().await?;

    println!("Removing fuse instance '{}'...", instance_id);

    session
        .deployer
        .remove_deploy(&instance_id, &session.config.broker_namespace, &session.cluster)
        .await?;

    println!("✓ Removal requested");
    println!(
        "Check progress with: fuse-broker-server status {} --operation {}",
        instance_id,
        names::operations::REMOVE
    );

    Ok(())
}

pub async fn run_status(instance_id: String, operation: String) -> Result<()> {
    let session = connect().await?;

    let status = session
        .deployer
        .last_operation(&instance_id, &operation, &session.cluster)
        .await;

    println!("{:<12} {:<12} {}", "OPERATION", "STATE", "DESCRIPTION");
    println!("{}", "-".repeat(60));
    println!("{:<12} {:<12} {}", operation, status.state, status.description);

    if let Some(cause) = &status.cause {
        println!();
        println!("Cause: {}", describe_error(cause));
    }

    Ok(())
}
