//! Provision a Fuse instance
//!
//! Steps run strictly in [`ProvisioningStep`] order and stop at the first
//! failure. Nothing already created is undone, so a second deploy of the same
//! instance fails at the namespace step; callers must treat deploy as
//! at-most-once per instance id.

use anyhow::{Context, Result};
use fuse_broker_models::{ContextProfile, CreateServiceInstanceResponse, UserInfo};
use kube::ResourceExt;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::k8s_client::{syndesis_resource, ClusterClient};
use crate::manifests::{self, SyndesisSpec};
use crate::names::{self, operations};
use crate::orchestrations::role_bindings::create_role_bindings;
use crate::types::{DeployerConfig, ProvisionError, ProvisionParameters, ProvisioningStep};

/// Everything needed to provision one instance
#[derive(Debug, Clone, Copy)]
pub struct DeployRequest<'a> {
    pub instance_id: &'a str,
    pub context: &'a ContextProfile,
    pub parameters: &'a Map<String, Value>,
    pub user: &'a UserInfo,
}

pub async fn deploy(
    client: &dyn ClusterClient,
    config: &DeployerConfig,
    request: DeployRequest<'_>,
) -> Result<CreateServiceInstanceResponse, ProvisionError> {
    info!(instance_id = %request.instance_id, "Deploying fuse");

    let parameters = ProvisionParameters::from_map(request.parameters).map_err(|e| {
        error!(instance_id = %request.instance_id, error = %e, "Rejected provision parameters");
        ProvisionError::bad_request(e)
    })?;

    let dashboard_url = create_resources(client, config, &request, &parameters)
        .await
        .map_err(|e| {
            error!(instance_id = %request.instance_id, error = %format!("{:#}", e), "Fuse deployment failed");
            ProvisionError::internal(e)
        })?;

    info!(instance_id = %request.instance_id, dashboard_url = %dashboard_url, "Fuse deployment accepted");
    Ok(CreateServiceInstanceResponse {
        code: 202,
        dashboard_url: Some(dashboard_url),
        operation: Some(operations::DEPLOY.to_string()),
    })
}

async fn create_resources(
    client: &dyn ClusterClient,
    config: &DeployerConfig,
    request: &DeployRequest<'_>,
    parameters: &ProvisionParameters,
) -> Result<String> {
    // Step 1: Namespace
    let namespace = ProvisioningStep::Namespace.wrap(
        async {
            let manifest = manifests::namespace(&names::instance_namespace(request.instance_id))?;
            anyhow::Ok(client.create_namespace(&manifest).await?.name_any())
        }
        .await,
    )?;
    info!(namespace = %namespace, "Namespace created");

    // Step 2: ServiceAccount
    ProvisioningStep::ServiceAccount.wrap(
        async { anyhow::Ok(client.create_service_account(&namespace, &manifests::service_account()?).await?) }
            .await,
    )?;

    // Step 3: Role
    ProvisioningStep::Role.wrap(
        async { anyhow::Ok(client.create_role(&namespace, &manifests::role()?).await?) }.await,
    )?;

    // Step 4: RoleBindings, each binding reports its own failure
    ProvisioningStep::RoleBindings.wrap(create_role_bindings(client, &namespace, request.user).await)?;

    // Step 5: ImageStreams, each stream reports its own failure
    ProvisioningStep::ImageStreams.wrap(
        async {
            let streams = manifests::image_streams().context("failed to render image streams for fuse service")?;
            for stream in streams {
                let name = stream.name_any();
                client
                    .create_image_stream(&namespace, &stream)
                    .await
                    .with_context(|| format!("failed to create {} image stream for fuse service", name))?;
            }
            anyhow::Ok(())
        }
        .await,
    )?;

    // Step 6: DeploymentConfig
    ProvisioningStep::DeploymentConfig.wrap(
        async { anyhow::Ok(client.create_deployment_config(&namespace, &manifests::deployment_config()?).await?) }
            .await,
    )?;
    info!(namespace = %namespace, "Syndesis operator created");

    // Step 7: Syndesis custom resource
    let hostname = names::route_hostname(&namespace, config.route_suffix.as_deref());
    let spec = SyndesisSpec {
        namespace: namespace.clone(),
        user_namespace: request.context.namespace.clone(),
        integration_limit: parameters.integration_limit,
        route_hostname: hostname.clone(),
        created_by: request.user.username.clone(),
    };
    ProvisioningStep::CustomResource.wrap(
        async {
            let manifest = manifests::syndesis(&spec)?;
            anyhow::Ok(client.create_custom_resource(&namespace, &syndesis_resource(), &manifest).await?)
        }
        .await,
    )?;

    Ok(names::dashboard_url(&hostname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s_client::test_support::{already_exists, server_error};
    use crate::k8s_client::MockClusterClient;
    use k8s_openapi::api::core::v1::Namespace;
    use serde_json::json;

    /// Mock where steps before `failing` succeed, `failing` errors and later steps are never called
    fn cluster_failing_at(failing: Option<usize>) -> MockClusterClient {
        let mut client = MockClusterClient::new();
        let calls = |step: usize| match failing {
            Some(f) if step > f => 0,
            _ => 1,
        };
        let fails = move |step: usize| failing == Some(step);

        let ns = client.expect_create_namespace().times(calls(0));
        if fails(0) {
            ns.returning(|ns| Err(already_exists(&ns.name_any())));
        } else {
            ns.returning(|ns| Ok(ns.clone()));
        }

        let sa = client.expect_create_service_account().times(calls(1));
        if fails(1) {
            sa.returning(|_, _| Err(server_error("quota exceeded")));
        } else {
            sa.returning(|_, _| Ok(()));
        }

        let role = client.expect_create_role().times(calls(2));
        if fails(2) {
            role.returning(|_, _| Err(server_error("forbidden")));
        } else {
            role.returning(|_, _| Ok(()));
        }

        let bindings = client.expect_create_role_binding().times(4 * calls(3));
        bindings.returning(|_, _| Ok(()));
        let auth = client
            .expect_create_authorization_role_binding()
            .times(if fails(3) { 1 } else { 3 * calls(3) });
        if fails(3) {
            auth.returning(|_, _| Err(server_error("authorization api unavailable")));
        } else {
            auth.returning(|_, _| Ok(()));
        }

        let streams = client
            .expect_create_image_stream()
            .times(if fails(4) { 1 } else { manifests::IMAGE_STREAMS.len() * calls(4) });
        if fails(4) {
            streams.returning(|_, _| Err(server_error("image api unavailable")));
        } else {
            streams.returning(|_, _| Ok(()));
        }

        let dc = client.expect_create_deployment_config().times(calls(5));
        if fails(5) {
            dc.returning(|_, _| Err(server_error("apps api unavailable")));
        } else {
            dc.returning(|_, _| Ok(()));
        }

        let cr = client.expect_create_custom_resource().times(calls(6));
        if fails(6) {
            cr.returning(|_, _, _| Err(server_error("no matches for kind Syndesis")));
        } else {
            cr.returning(|_, _, _| Ok(()));
        }

        client
    }

    fn user() -> UserInfo {
        UserInfo {
            username: "developer".to_string(),
            ..Default::default()
        }
    }

    fn context() -> ContextProfile {
        ContextProfile {
            platform: "kubernetes".to_string(),
            namespace: "my-project".to_string(),
        }
    }

    async fn run(
        client: &MockClusterClient,
        config: &DeployerConfig,
        parameters: &Map<String, Value>,
    ) -> Result<CreateServiceInstanceResponse, ProvisionError> {
        let user = user();
        let context = context();
        deploy(
            client,
            config,
            DeployRequest {
                instance_id: "abc123",
                context: &context,
                parameters,
                user: &user,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_deploy_returns_dashboard_url() {
        let client = cluster_failing_at(None);
        let response = run(&client, &DeployerConfig::default(), &Map::new()).await.unwrap();

        assert_eq!(response.code, 202);
        assert_eq!(response.dashboard_url.as_deref(), Some("https://fuse-abc123"));
        assert_eq!(response.operation.as_deref(), Some("deploy"));
    }

    #[tokio::test]
    async fn test_deploy_appends_route_suffix() {
        let client = cluster_failing_at(None);
        let config = DeployerConfig::new(Some("apps.example.com".to_string()));
        let response = run(&client, &config, &Map::new()).await.unwrap();

        assert_eq!(
            response.dashboard_url.as_deref(),
            Some("https://fuse-abc123.apps.example.com")
        );
    }

    #[tokio::test]
    async fn test_failing_step_stops_the_sequence() {
        for (index, step) in ProvisioningStep::ALL.iter().enumerate() {
            let client = cluster_failing_at(Some(index));
            let err = run(&client, &DeployerConfig::default(), &Map::new())
                .await
                .unwrap_err();

            let expected = step.failure_message().unwrap_or(match step {
                ProvisioningStep::RoleBindings => "failed to create view role binding for fuse service",
                _ => "failed to create fuse-ignite-server image stream for fuse service",
            });
            assert_eq!(err.code, 500);
            assert!(
                err.to_string().starts_with(&format!("{}: ", expected)),
                "step {} reported: {}",
                step,
                err
            );
            // call counts are checked when the mock drops
            drop(client);
        }
    }

    #[tokio::test]
    async fn test_binding_and_image_stream_failures_are_not_rewrapped() {
        let client = cluster_failing_at(Some(3));
        let err = run(&client, &DeployerConfig::default(), &Map::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to create view role binding for fuse service: authorization api unavailable"
        );
        drop(client);

        let client = cluster_failing_at(Some(4));
        let err = run(&client, &DeployerConfig::default(), &Map::new()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to create fuse-ignite-server image stream for fuse service: image api unavailable"
        );
    }

    #[tokio::test]
    async fn test_namespace_is_derived_from_instance_id() {
        let mut client = MockClusterClient::new();
        client
            .expect_create_namespace()
            .withf(|ns: &Namespace| ns.name_any() == "fuse-abc123")
            .times(1)
            .returning(|_| Err(server_error("namespace quota exceeded")));

        let err = run(&client, &DeployerConfig::default(), &Map::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to create namespace for fuse service: namespace quota exceeded"
        );
    }

    #[tokio::test]
    async fn test_custom_resource_carries_limit_and_creator() {
        let mut client = MockClusterClient::new();
        client.expect_create_namespace().returning(|ns| Ok(ns.clone()));
        client.expect_create_service_account().returning(|_, _| Ok(()));
        client.expect_create_role().returning(|_, _| Ok(()));
        client.expect_create_role_binding().returning(|_, _| Ok(()));
        client.expect_create_authorization_role_binding().returning(|_, _| Ok(()));
        client.expect_create_image_stream().returning(|_, _| Ok(()));
        client.expect_create_deployment_config().returning(|_, _| Ok(()));
        client
            .expect_create_custom_resource()
            .withf(|namespace, resource, cr| {
                namespace == "fuse-abc123"
                    && resource.kind == "Syndesis"
                    && cr.data["spec"]["integration"]["limit"] == 4
                    && cr.data["spec"]["sarNamespace"] == "my-project"
                    && cr.annotations().get("syndesis.io/created-by").map(String::as_str)
                        == Some("developer")
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let parameters = json!({"limit": 4}).as_object().cloned().unwrap();
        run(&client, &DeployerConfig::default(), &parameters).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_limit_is_rejected_before_any_cluster_call() {
        let mut client = MockClusterClient::new();
        client.expect_create_namespace().never();

        let parameters = json!({"limit": "unlimited"}).as_object().cloned().unwrap();
        let err = run(&client, &DeployerConfig::default(), &parameters)
            .await
            .unwrap_err();

        assert_eq!(err.code, 400);
        assert!(err.to_string().contains("limit"));
    }
}
