//! Registry of the deployers the broker serves

use std::sync::Arc;

use fuse_broker_models::Catalog;

use crate::deployer::{Deployer, FuseDeployer};
use crate::types::DeployerConfig;

/// Deployers keyed by the service ids they answer for
#[derive(Clone, Default)]
pub struct DeployerRegistry {
    deployers: Vec<Arc<dyn Deployer>>,
}

impl DeployerRegistry {
    pub fn builder() -> DeployerRegistryBuilder {
        DeployerRegistryBuilder::default()
    }

    /// First deployer that answers for `service_id`
    pub fn find(&self, service_id: &str) -> Option<Arc<dyn Deployer>> {
        self.deployers
            .iter()
            .find(|d| d.is_for_service(service_id))
            .cloned()
    }

    pub fn catalog(&self) -> Catalog {
        Catalog {
            services: self
                .deployers
                .iter()
                .flat_map(|d| d.catalog_entries())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.deployers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployers.is_empty()
    }
}

#[derive(Default)]
pub struct DeployerRegistryBuilder {
    deployers: Vec<Arc<dyn Deployer>>,
}

impl DeployerRegistryBuilder {
    pub fn register(mut self, deployer: impl Deployer + 'static) -> Self {
        self.deployers.push(Arc::new(deployer));
        self
    }

    pub fn build(self) -> DeployerRegistry {
        DeployerRegistry {
            deployers: self.deployers,
        }
    }
}

/// Create a DeployerRegistry with every deployer this broker ships
///
/// # Example
///
/// ```rust
/// use fuse_broker_orchestrations::registry::create_deployer_registry;
/// use fuse_broker_orchestrations::DeployerConfig;
///
/// let registry = create_deployer_registry("fuse-deployer", DeployerConfig::default());
/// assert!(registry.find("fuse-service-id").is_some());
/// ```
pub fn create_deployer_registry(deployer_id: &str, config: DeployerConfig) -> DeployerRegistry {
    DeployerRegistry::builder()
        .register(FuseDeployer::new(deployer_id, config))
        .build()
}
