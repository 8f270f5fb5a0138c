//! Deployer seam between the broker host and a managed service

use async_trait::async_trait;
use fuse_broker_models::{ContextProfile, CreateServiceInstanceResponse, Service, UserInfo};
use serde_json::{Map, Value};
use tracing::info;

use crate::catalog;
use crate::k8s_client::ClusterClient;
use crate::names::SERVICE_ID;
use crate::orchestrations::deploy::{deploy, DeployRequest};
use crate::orchestrations::last_operation::last_operation;
use crate::orchestrations::remove::remove_deploy;
use crate::types::{DeployerConfig, OperationStatus, ProvisionError};

/// A managed service the broker can provision
#[async_trait]
pub trait Deployer: Send + Sync {
    fn id(&self) -> &str;

    fn is_for_service(&self, service_id: &str) -> bool;

    fn catalog_entries(&self) -> Vec<Service>;

    /// Start provisioning; returns once the resources have been requested
    async fn deploy(
        &self,
        instance_id: &str,
        broker_namespace: &str,
        context: &ContextProfile,
        parameters: &Map<String, Value>,
        user: &UserInfo,
        client: &dyn ClusterClient,
    ) -> Result<CreateServiceInstanceResponse, ProvisionError>;

    async fn remove_deploy(
        &self,
        instance_id: &str,
        namespace: &str,
        client: &dyn ClusterClient,
    ) -> anyhow::Result<()>;

    /// Never fails; an observed error travels as the status cause
    async fn last_operation(
        &self,
        instance_id: &str,
        operation: &str,
        client: &dyn ClusterClient,
    ) -> OperationStatus;
}

/// Deploys Fuse Online (Syndesis) into a dedicated namespace per instance
#[derive(Debug, Clone)]
pub struct FuseDeployer {
    id: String,
    config: DeployerConfig,
}

impl FuseDeployer {
    pub fn new(id: impl Into<String>, config: DeployerConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }
}

#[async_trait]
impl Deployer for FuseDeployer {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_for_service(&self, service_id: &str) -> bool {
        service_id == SERVICE_ID
    }

    fn catalog_entries(&self) -> Vec<Service> {
        info!("Getting fuse catalog entries");
        catalog::fuse_services()
    }

    async fn deploy(
        &self,
        instance_id: &str,
        broker_namespace: &str,
        context: &ContextProfile,
        parameters: &Map<String, Value>,
        user: &UserInfo,
        client: &dyn ClusterClient,
    ) -> Result<CreateServiceInstanceResponse, ProvisionError> {
        info!(
            instance_id = %instance_id,
            broker_namespace = %broker_namespace,
            "Deploying fuse from deployer"
        );
        deploy(
            client,
            &self.config,
            DeployRequest {
                instance_id,
                context,
                parameters,
                user,
            },
        )
        .await
    }

    async fn remove_deploy(
        &self,
        instance_id: &str,
        _namespace: &str,
        client: &dyn ClusterClient,
    ) -> anyhow::Result<()> {
        remove_deploy(client, instance_id).await
    }

    async fn last_operation(
        &self,
        instance_id: &str,
        operation: &str,
        client: &dyn ClusterClient,
    ) -> OperationStatus {
        info!(instance_id = %instance_id, operation = %operation, "Getting last operation");
        last_operation(client, instance_id, operation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s_client::test_support::not_found;
    use crate::k8s_client::MockClusterClient;
    use fuse_broker_models::OperationState;

    fn deployer() -> FuseDeployer {
        FuseDeployer::new("fuse-deployer", DeployerConfig::default())
    }

    #[test]
    fn test_service_matching_is_exact() {
        let deployer = deployer();
        assert!(deployer.is_for_service("fuse-service-id"));
        assert!(!deployer.is_for_service("fuse-service-id "));
        assert!(!deployer.is_for_service("launcher-service-id"));
        assert_eq!(deployer.id(), "fuse-deployer");
    }

    #[test]
    fn test_catalog_advertises_fuse() {
        let services = deployer().catalog_entries();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].id, SERVICE_ID);
        assert_eq!(services[0].plans.len(), 1);
        assert!(!services[0].bindable);
    }

    #[tokio::test]
    async fn test_remove_then_poll_reports_removed() {
        let mut client = MockClusterClient::new();
        client
            .expect_delete_namespace()
            .times(1)
            .returning(|name| Err(not_found(name)));
        client
            .expect_get_namespace()
            .times(1)
            .returning(|name| Err(not_found(name)));

        let deployer = deployer();
        deployer
            .remove_deploy("abc123", "my-project", &client)
            .await
            .unwrap();
        let status = deployer.last_operation("abc123", "remove", &client).await;
        assert_eq!(status.state, OperationState::Succeeded);
    }
}
