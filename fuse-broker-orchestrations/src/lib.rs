//! Fuse Broker Orchestrations - provisioning, removal and status polling for Fuse Online
//!
//! This crate creates the resources of a Fuse Online instance on an OpenShift
//! cluster, deletes them again, and answers last-operation polls from the
//! broker host by inspecting live cluster state.
//!
//! # Usage
//!
//! ```rust,no_run
//! use fuse_broker_orchestrations::k8s_client::KubeClusterClient;
//! use fuse_broker_orchestrations::registry::create_deployer_registry;
//! use fuse_broker_orchestrations::DeployerConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = KubeClusterClient::try_default().await?;
//! let registry = create_deployer_registry("fuse-deployer", DeployerConfig::default());
//!
//! if let Some(deployer) = registry.find("fuse-service-id") {
//!     let status = deployer.last_operation("abc123", "deploy", &client).await;
//!     println!("{}: {}", status.state, status.description);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod deployer;
pub mod k8s_client;
pub mod manifests;
pub mod names;
pub mod registry;
pub mod types;

pub mod orchestrations;

// Re-export key types for convenience
pub use deployer::{Deployer, FuseDeployer};
pub use types::*;
