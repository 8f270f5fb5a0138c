//! Cluster client seam and its kube-backed implementation
//!
//! Orchestration code only talks to [`ClusterClient`], so tests can swap the
//! cluster for a mock and count calls. OpenShift kinds (ImageStream,
//! DeploymentConfig, authorization RoleBinding) and the Syndesis custom
//! resource have no typed bindings and travel as [`DynamicObject`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, PostParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Get a Kubernetes client
pub async fn get_k8s_client() -> Result<Client> {
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client")
}

/// True when the API server answered 404
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// True when the API server rejected a create because the object exists
pub fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409 || response.reason == "AlreadyExists")
}

/// Render an error chain as `context: ...: message`.
///
/// The chain stops at the first API server error, which contributes only its
/// message; `kube::Error::Api` otherwise repeats itself through its source.
pub fn describe_error(err: &anyhow::Error) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        if let Some(kube::Error::Api(response)) = cause.downcast_ref::<kube::Error>() {
            parts.push(response.message.clone());
            break;
        }
        parts.push(cause.to_string());
    }
    parts.join(": ")
}

/// `image.openshift.io/v1` ImageStream
pub fn image_stream_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("image.openshift.io", "v1", "ImageStream"),
        "imagestreams",
    )
}

/// `apps.openshift.io/v1` DeploymentConfig
pub fn deployment_config_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("apps.openshift.io", "v1", "DeploymentConfig"),
        "deploymentconfigs",
    )
}

/// `authorization.openshift.io/v1` RoleBinding
pub fn authorization_role_binding_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("authorization.openshift.io", "v1", "RoleBinding"),
        "rolebindings",
    )
}

/// `syndesis.io/v1alpha1` Syndesis
pub fn syndesis_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk("syndesis.io", "v1alpha1", "Syndesis"),
        "syndesises",
    )
}

/// Cluster operations the deployer needs
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, kube::Error>;

    async fn get_namespace(&self, name: &str) -> Result<Namespace, kube::Error>;

    async fn delete_namespace(&self, name: &str) -> Result<(), kube::Error>;

    async fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<(), kube::Error>;

    async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), kube::Error>;

    /// Create an `rbac.authorization.k8s.io` RoleBinding
    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> Result<(), kube::Error>;

    /// Create an `authorization.openshift.io` RoleBinding
    async fn create_authorization_role_binding(
        &self,
        namespace: &str,
        binding: &DynamicObject,
    ) -> Result<(), kube::Error>;

    async fn create_image_stream(
        &self,
        namespace: &str,
        image_stream: &DynamicObject,
    ) -> Result<(), kube::Error>;

    async fn create_deployment_config(
        &self,
        namespace: &str,
        deployment_config: &DynamicObject,
    ) -> Result<(), kube::Error>;

    async fn get_deployment_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, kube::Error>;

    /// Create an arbitrary custom resource of the given API resource type
    async fn create_custom_resource(
        &self,
        namespace: &str,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<(), kube::Error>;
}

/// [`ClusterClient`] backed by a live API server
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build from the ambient kubeconfig or in-cluster service account
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(get_k8s_client().await?))
    }

    fn dynamic(&self, namespace: &str, resource: &ApiResource) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, resource)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_namespace(&self, namespace: &Namespace) -> Result<Namespace, kube::Error> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.create(&PostParams::default(), namespace).await
    }

    async fn get_namespace(&self, name: &str) -> Result<Namespace, kube::Error> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.get(name).await
    }

    async fn delete_namespace(&self, name: &str) -> Result<(), kube::Error> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.delete(name, &DeleteParams::default()).await?;
        debug!(namespace = %name, "Namespace deletion accepted");
        Ok(())
    }

    async fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<(), kube::Error> {
        let accounts: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        accounts.create(&PostParams::default(), service_account).await?;
        Ok(())
    }

    async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), kube::Error> {
        let roles: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        roles.create(&PostParams::default(), role).await?;
        Ok(())
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        binding: &RoleBinding,
    ) -> Result<(), kube::Error> {
        let bindings: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        bindings.create(&PostParams::default(), binding).await?;
        Ok(())
    }

    async fn create_authorization_role_binding(
        &self,
        namespace: &str,
        binding: &DynamicObject,
    ) -> Result<(), kube::Error> {
        self.dynamic(namespace, &authorization_role_binding_resource())
            .create(&PostParams::default(), binding)
            .await?;
        Ok(())
    }

    async fn create_image_stream(
        &self,
        namespace: &str,
        image_stream: &DynamicObject,
    ) -> Result<(), kube::Error> {
        self.dynamic(namespace, &image_stream_resource())
            .create(&PostParams::default(), image_stream)
            .await?;
        Ok(())
    }

    async fn create_deployment_config(
        &self,
        namespace: &str,
        deployment_config: &DynamicObject,
    ) -> Result<(), kube::Error> {
        self.dynamic(namespace, &deployment_config_resource())
            .create(&PostParams::default(), deployment_config)
            .await?;
        Ok(())
    }

    async fn get_deployment_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, kube::Error> {
        self.dynamic(namespace, &deployment_config_resource())
            .get(name)
            .await
    }

    async fn create_custom_resource(
        &self,
        namespace: &str,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<(), kube::Error> {
        self.dynamic(namespace, resource)
            .create(&PostParams::default(), object)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use kube::error::ErrorResponse;

    /// API error as the server would report it
    pub fn api_error(code: u16, reason: &str, message: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: message.to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    pub fn not_found(name: &str) -> kube::Error {
        api_error(404, "NotFound", &format!("\"{}\" not found", name))
    }

    pub fn already_exists(name: &str) -> kube::Error {
        api_error(409, "AlreadyExists", &format!("\"{}\" already exists", name))
    }

    pub fn server_error(message: &str) -> kube::Error {
        api_error(500, "InternalError", message)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(is_not_found(&not_found("fuse-abc")));
        assert!(!is_not_found(&already_exists("fuse-abc")));
        assert!(is_already_exists(&already_exists("system:deployers")));
        assert!(!is_already_exists(&server_error("etcd unavailable")));
        assert!(!is_not_found(&server_error("etcd unavailable")));
    }

    #[test]
    fn test_describe_error_keeps_only_api_message() {
        let err = anyhow::Error::new(server_error("namespace quota exceeded"))
            .context("failed to create namespace for fuse service");
        assert_eq!(
            describe_error(&err),
            "failed to create namespace for fuse service: namespace quota exceeded"
        );

        let plain = anyhow::anyhow!("connection refused").context("failed to create role for fuse service");
        assert_eq!(
            describe_error(&plain),
            "failed to create role for fuse service: connection refused"
        );
    }

    #[test]
    fn test_openshift_resources_use_expected_plurals() {
        let syndesis = syndesis_resource();
        assert_eq!(syndesis.api_version, "syndesis.io/v1alpha1");
        assert_eq!(syndesis.plural, "syndesises");
        assert_eq!(deployment_config_resource().group, "apps.openshift.io");
        assert_eq!(image_stream_resource().plural, "imagestreams");
        assert_eq!(authorization_role_binding_resource().group, "authorization.openshift.io");
    }
}
