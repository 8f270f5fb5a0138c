//! Name constants and naming helpers for the Fuse deployer
//!
//! The namespace derived from an instance id is the only link between a
//! broker instance and its resources on the cluster.

/// Service id the Fuse deployer answers for
pub const SERVICE_ID: &str = "fuse-service-id";

/// Prefix of every instance namespace
pub const NAMESPACE_PREFIX: &str = "fuse-";

/// Seconds after namespace creation during which deploy failures read as in progress
pub const GRACE_WINDOW_SECS: i64 = 120;

/// DeploymentConfigs that must all be ready before a deploy has succeeded.
///
/// Order matters: the first one that is not ready decides the reported status.
pub const WATCHED_WORKLOADS: [&str; 3] = ["syndesis-oauthproxy", "syndesis-server", "syndesis-ui"];

/// Operation tags used by the broker host when polling
pub mod operations {
    pub const DEPLOY: &str = "deploy";
    pub const REMOVE: &str = "remove";
}

/// Namespace that houses every resource of an instance
pub fn instance_namespace(instance_id: &str) -> String {
    format!("{}{}", NAMESPACE_PREFIX, instance_id)
}

/// External hostname of the Fuse console for an instance namespace
pub fn route_hostname(namespace: &str, route_suffix: Option<&str>) -> String {
    match route_suffix {
        Some(suffix) => format!("{}.{}", namespace, suffix),
        None => namespace.to_string(),
    }
}

/// Dashboard URL handed back to the broker host
pub fn dashboard_url(hostname: &str) -> String {
    format!("https://{}", hostname)
}
