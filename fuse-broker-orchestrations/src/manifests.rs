//! Manifests for the resources that make up a Fuse instance
//!
//! Each builder renders a YAML template and parses it into the typed or
//! dynamic object the cluster client expects.

use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use tera::{Context, Tera};

const NAMESPACE: &str = "namespace";
const SERVICE_ACCOUNT: &str = "service-account";
const ROLE: &str = "role";
const ROLE_BINDING: &str = "role-binding";
const AUTHORIZATION_ROLE_BINDING: &str = "authorization-role-binding";
const IMAGE_STREAM: &str = "image-stream";
const DEPLOYMENT_CONFIG: &str = "deployment-config";
const SYNDESIS: &str = "syndesis";

/// Service account the Syndesis operator runs as
pub const OPERATOR_SERVICE_ACCOUNT: &str = "syndesis-operator";

const IMAGE_REGISTRY: &str = "registry.access.redhat.com/fuse7";
const IMAGE_TAG: &str = "1.4";
const OPERATOR_IMAGE_STREAM: &str = "fuse-online-operator";

/// Image streams imported into every instance namespace, in creation order
pub const IMAGE_STREAMS: [&str; 5] = [
    "fuse-ignite-server",
    "fuse-ignite-ui",
    "fuse-ignite-meta",
    "fuse-ignite-s2i",
    OPERATOR_IMAGE_STREAM,
];

/// Values embedded in the Syndesis custom resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyndesisSpec {
    pub namespace: String,
    /// Namespace the provision request came from
    pub user_namespace: String,
    pub integration_limit: u32,
    pub route_hostname: String,
    pub created_by: String,
}

fn templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (NAMESPACE, include_str!("templates/namespace.yaml")),
        (SERVICE_ACCOUNT, include_str!("templates/service-account.yaml")),
        (ROLE, include_str!("templates/role.yaml")),
        (ROLE_BINDING, include_str!("templates/role-binding.yaml")),
        (AUTHORIZATION_ROLE_BINDING, include_str!("templates/authorization-role-binding.yaml")),
        (IMAGE_STREAM, include_str!("templates/image-stream.yaml")),
        (DEPLOYMENT_CONFIG, include_str!("templates/deployment-config.yaml")),
        (SYNDESIS, include_str!("templates/syndesis.yaml")),
    ])
    .context("Failed to load manifest templates")?;
    Ok(tera)
}

fn render<T: DeserializeOwned>(template: &str, ctx: &Context) -> Result<T> {
    let yaml = templates()?
        .render(template, ctx)
        .with_context(|| format!("Failed to render {} manifest", template))?;
    serde_yaml::from_str(&yaml).with_context(|| format!("Failed to parse {} manifest", template))
}

pub fn namespace(name: &str) -> Result<Namespace> {
    let mut ctx = Context::new();
    ctx.insert("namespace", name);
    render(NAMESPACE, &ctx)
}

pub fn service_account() -> Result<ServiceAccount> {
    render(SERVICE_ACCOUNT, &Context::new())
}

pub fn role() -> Result<Role> {
    render(ROLE, &Context::new())
}

fn role_binding(
    namespace: &str,
    name: &str,
    role_kind: &str,
    role: &str,
    subject_kind: &str,
    subject: &str,
) -> Result<RoleBinding> {
    let mut ctx = Context::new();
    ctx.insert("namespace", namespace);
    ctx.insert("name", name);
    ctx.insert("role_kind", role_kind);
    ctx.insert("role", role);
    ctx.insert("subject_kind", subject_kind);
    ctx.insert("subject", subject);
    render(ROLE_BINDING, &ctx)
}

/// Bindings that let the platform's builder, deployer and puller accounts work in the namespace
pub fn system_role_bindings(namespace: &str) -> Result<Vec<RoleBinding>> {
    let service_accounts = format!("system:serviceaccounts:{}", namespace);
    vec![
        ("system:deployers", "system:deployer", "ServiceAccount", "deployer"),
        ("system:image-builders", "system:image-builder", "ServiceAccount", "builder"),
        ("system:image-pullers", "system:image-puller", "Group", service_accounts.as_str()),
    ]
    .into_iter()
    .map(|(name, role, subject_kind, subject)| {
        role_binding(namespace, name, "ClusterRole", role, subject_kind, subject)
    })
    .collect()
}

/// Binds the operator service account to its namespaced role
pub fn install_role_binding(namespace: &str) -> Result<RoleBinding> {
    role_binding(
        namespace,
        "syndesis-operator:install",
        "Role",
        OPERATOR_SERVICE_ACCOUNT,
        "ServiceAccount",
        OPERATOR_SERVICE_ACCOUNT,
    )
}

fn authorization_role_binding(
    name: &str,
    role: &str,
    subject_kind: &str,
    subject: &str,
) -> Result<DynamicObject> {
    let mut ctx = Context::new();
    ctx.insert("name", name);
    ctx.insert("role", role);
    ctx.insert("subject_kind", subject_kind);
    ctx.insert("subject", subject);
    render(AUTHORIZATION_ROLE_BINDING, &ctx)
}

pub fn view_role_binding() -> Result<DynamicObject> {
    authorization_role_binding(
        "syndesis-operator:view",
        "view",
        "ServiceAccount",
        OPERATOR_SERVICE_ACCOUNT,
    )
}

pub fn edit_role_binding() -> Result<DynamicObject> {
    authorization_role_binding(
        "syndesis-operator:edit",
        "edit",
        "ServiceAccount",
        OPERATOR_SERVICE_ACCOUNT,
    )
}

/// Grants the requesting user read access to the instance namespace
pub fn user_view_role_binding(namespace: &str, username: &str) -> Result<DynamicObject> {
    authorization_role_binding(&format!("{}-user-view", namespace), "view", "User", username)
}

pub fn image_streams() -> Result<Vec<DynamicObject>> {
    IMAGE_STREAMS
        .iter()
        .map(|name| {
            let mut ctx = Context::new();
            ctx.insert("name", name);
            ctx.insert("image", &format!("{}/{}", IMAGE_REGISTRY, name));
            ctx.insert("tag", IMAGE_TAG);
            render(IMAGE_STREAM, &ctx)
        })
        .collect()
}

/// DeploymentConfig for the Syndesis operator, which installs the rest of Fuse
pub fn deployment_config() -> Result<DynamicObject> {
    let mut ctx = Context::new();
    ctx.insert("operator_image", &format!("{}/{}", IMAGE_REGISTRY, OPERATOR_IMAGE_STREAM));
    ctx.insert("operator_image_stream", OPERATOR_IMAGE_STREAM);
    ctx.insert("tag", IMAGE_TAG);
    render(DEPLOYMENT_CONFIG, &ctx)
}

pub fn syndesis(spec: &SyndesisSpec) -> Result<DynamicObject> {
    let mut ctx = Context::new();
    ctx.insert("namespace", &spec.namespace);
    ctx.insert("user_namespace", &spec.user_namespace);
    ctx.insert("integration_limit", &spec.integration_limit);
    ctx.insert("route_hostname", &spec.route_hostname);
    ctx.insert("created_by", &spec.created_by);
    render(SYNDESIS, &ctx)
}
