//! Permission bindings for a Fuse instance namespace

use anyhow::{Context, Result};
use fuse_broker_models::UserInfo;
use kube::ResourceExt;
use tracing::{debug, info};

use crate::k8s_client::{is_already_exists, ClusterClient};
use crate::manifests;

/// Create every binding the instance needs.
///
/// Only the system bindings tolerate "already exists"; any other failure,
/// including a conflict on the install, view, edit or user bindings, aborts.
pub async fn create_role_bindings(
    client: &dyn ClusterClient,
    namespace: &str,
    user: &UserInfo,
) -> Result<()> {
    for binding in manifests::system_role_bindings(namespace)? {
        let name = binding.name_any();
        match client.create_role_binding(namespace, &binding).await {
            Ok(()) => debug!(namespace = %namespace, binding = %name, "Role binding created"),
            Err(e) if is_already_exists(&e) => {
                debug!(namespace = %namespace, binding = %name, "Role binding already exists");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create rolebinding for {}", name))
            }
        }
    }

    client
        .create_role_binding(namespace, &manifests::install_role_binding(namespace)?)
        .await
        .context("failed to create install role binding for fuse service")?;

    client
        .create_authorization_role_binding(namespace, &manifests::view_role_binding()?)
        .await
        .context("failed to create view role binding for fuse service")?;

    client
        .create_authorization_role_binding(namespace, &manifests::edit_role_binding()?)
        .await
        .context("failed to create edit role binding for fuse service")?;

    client
        .create_authorization_role_binding(
            namespace,
            &manifests::user_view_role_binding(namespace, &user.username)?,
        )
        .await
        .context("failed to create user view role binding for fuse service")?;

    info!(namespace = %namespace, user = %user.username, "Role bindings created");
    Ok(())
}
