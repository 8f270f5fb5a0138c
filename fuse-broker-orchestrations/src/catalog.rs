//! Catalog entries published by the Fuse deployer

use fuse_broker_models::{Service, ServiceMetadata, ServicePlan};

use crate::names::SERVICE_ID;

pub const PLAN_ID: &str = "fuse-plan-id";

pub fn fuse_services() -> Vec<Service> {
    vec![Service {
        id: SERVICE_ID.to_string(),
        name: "fuse".to_string(),
        description: "Integration platform as a service".to_string(),
        bindable: false,
        plan_updateable: false,
        tags: vec!["fuse".to_string(), "integration".to_string()],
        metadata: Some(ServiceMetadata {
            display_name: "Fuse Online".to_string(),
            documentation_url: Some(
                "https://access.redhat.com/documentation/en-us/red_hat_fuse/".to_string(),
            ),
            long_description: Some(
                "An integration platform that provides a simple way to connect applications and services"
                    .to_string(),
            ),
            service_name: Some("fuse".to_string()),
        }),
        plans: vec![ServicePlan {
            id: PLAN_ID.to_string(),
            name: "default-fuse".to_string(),
            description: "default fuse plan".to_string(),
            free: true,
        }],
    }]
}
