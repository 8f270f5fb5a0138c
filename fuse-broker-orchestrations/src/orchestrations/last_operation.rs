//! Last-operation polling for deploy and remove
//!
//! Every poll recomputes the status from live cluster state. The only memory
//! between polls is the namespace creation timestamp, which drives the grace
//! window on the deploy path.

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use kube::api::DynamicObject;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::k8s_client::{is_not_found, ClusterClient};
use crate::names::{instance_namespace, operations, GRACE_WINDOW_SECS, WATCHED_WORKLOADS};
use crate::types::OperationStatus;

/// Status of `operation` for an instance, as of now
pub async fn last_operation(
    client: &dyn ClusterClient,
    instance_id: &str,
    operation: &str,
) -> OperationStatus {
    last_operation_at(client, instance_id, operation, Utc::now()).await
}

/// Status of `operation` for an instance, evaluated at `now`
pub async fn last_operation_at(
    client: &dyn ClusterClient,
    instance_id: &str,
    operation: &str,
    now: DateTime<Utc>,
) -> OperationStatus {
    let namespace = instance_namespace(instance_id);
    debug!(namespace = %namespace, operation = %operation, "Checking last operation");

    match operation {
        operations::DEPLOY => deploy_status(client, &namespace, now).await,
        operations::REMOVE => remove_status(client, &namespace).await,
        other => OperationStatus::failed(format!("unknown operation: {}", other)),
    }
}

async fn deploy_status(
    client: &dyn ClusterClient,
    namespace: &str,
    now: DateTime<Utc>,
) -> OperationStatus {
    let ns = match client.get_namespace(namespace).await {
        Ok(ns) => ns,
        Err(e) => {
            warn!(namespace = %namespace, error = %e, "Failed to get namespace for last operation check");
            return OperationStatus::failed(format!(
                "Failed to get namespace {} for last operation check",
                namespace
            ))
            .with_cause(anyhow!(e).context(format!(
                "failed to get namespace {} for last operation check",
                namespace
            )));
        }
    };

    // A namespace without a timestamp has not been persisted long enough to have one
    let young = ns
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|created| now.signed_duration_since(created.0) <= Duration::seconds(GRACE_WINDOW_SECS))
        .unwrap_or(true);

    for workload in WATCHED_WORKLOADS {
        let status = workload_status(client, namespace, workload).await;
        if status.is_succeeded() {
            continue;
        }

        if young {
            info!(
                namespace = %namespace,
                workload = %workload,
                "Namespace is within the grace window, reporting in progress"
            );
            return OperationStatus::in_progress(status.description);
        }

        info!(
            namespace = %namespace,
            workload = %workload,
            state = %status.state,
            "Namespace is past the grace window, reporting actual state"
        );
        return status;
    }

    info!(namespace = %namespace, "Fuse deployed successfully");
    OperationStatus::succeeded("fuse deployed successfully")
}

async fn remove_status(client: &dyn ClusterClient, namespace: &str) -> OperationStatus {
    match client.get_namespace(namespace).await {
        Ok(_) => OperationStatus::in_progress("fuse removal in progress"),
        Err(e) if is_not_found(&e) => OperationStatus::succeeded("fuse removed successfully"),
        Err(e) => {
            warn!(namespace = %namespace, error = %e, "Failed to look up namespace during removal");
            OperationStatus::in_progress("failed to find namespace")
                .with_cause(anyhow!(e).context("could not find namespace"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkloadCondition {
    #[serde(rename = "type")]
    type_: String,
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Readiness of one DeploymentConfig
async fn workload_status(client: &dyn ClusterClient, namespace: &str, name: &str) -> OperationStatus {
    match client.get_deployment_config(namespace, name).await {
        Ok(dc) => readiness(&dc),
        Err(e) => {
            warn!(namespace = %namespace, workload = %name, error = %e, "Failed to get workload status");
            OperationStatus::failed(format!("Failed to get status of {}", name))
                .with_cause(anyhow!(e).context(format!("failed to get status of {}", name)))
        }
    }
}

/// A `Ready=False` condition means still rolling out; absent or true means ready
fn readiness(dc: &DynamicObject) -> OperationStatus {
    // A malformed entry is skipped on its own
    dc.data
        .pointer("/status/conditions")
        .and_then(|value| value.as_array())
        .into_iter()
        .flatten()
        .filter_map(|value| WorkloadCondition::deserialize(value).ok())
        .find(|c| c.type_ == "Ready" && c.status == "False")
        .map(|c| OperationStatus::in_progress(c.message.unwrap_or_default()))
        .unwrap_or_else(|| OperationStatus::succeeded(""))
}
