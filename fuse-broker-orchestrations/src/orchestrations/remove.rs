//! Remove a Fuse instance by deleting its namespace

use anyhow::{anyhow, Result};
use tracing::{error, info};

use crate::k8s_client::{is_not_found, ClusterClient};
use crate::names::instance_namespace;

/// Delete the instance namespace. An already missing namespace counts as removed.
pub async fn remove_deploy(client: &dyn ClusterClient, instance_id: &str) -> Result<()> {
    let namespace = instance_namespace(instance_id);

    match client.delete_namespace(&namespace).await {
        Ok(()) => {
            info!(namespace = %namespace, "Fuse namespace deletion requested");
            Ok(())
        }
        Err(e) if is_not_found(&e) => {
            info!(namespace = %namespace, "Fuse namespace already deleted");
            Ok(())
        }
        Err(e) => {
            error!(namespace = %namespace, error = %e, "Failed to delete fuse namespace");
            Err(anyhow!(e).context(format!("failed to delete namespace {}", namespace)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s_client::test_support::{not_found, server_error};
    use crate::k8s_client::MockClusterClient;

    #[tokio::test]
    async fn test_remove_deletes_instance_namespace_once() {
        let mut client = MockClusterClient::new();
        client
            .expect_delete_namespace()
            .withf(|name| name == "fuse-abc123")
            .times(1)
            .returning(|_| Ok(()));

        remove_deploy(&client, "abc123").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_missing_namespace_is_success() {
        let mut client = MockClusterClient::new();
        client
            .expect_delete_namespace()
            .times(1)
            .returning(|name| Err(not_found(name)));

        remove_deploy(&client, "abc123").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_other_errors_are_fatal() {
        let mut client = MockClusterClient::new();
        client
            .expect_delete_namespace()
            .times(1)
            .returning(|_| Err(server_error("etcd unavailable")));

        let err = remove_deploy(&client, "abc123").await.unwrap_err();
        assert_eq!(err.to_string(), "failed to delete namespace fuse-abc123");
    }
}
