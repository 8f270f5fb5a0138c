//! Input, output and status types for the Fuse deployer

use anyhow::Context;
use fuse_broker_models::{LastOperationResponse, OperationState};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::k8s_client::describe_error;

// ============================================================================
// Configuration
// ============================================================================

/// Static configuration handed to the deployer at construction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployerConfig {
    /// Suffix appended to the instance namespace to form the route hostname
    pub route_suffix: Option<String>,
}

impl DeployerConfig {
    pub fn new(route_suffix: Option<String>) -> Self {
        Self {
            route_suffix: route_suffix.filter(|s| !s.trim().is_empty()),
        }
    }
}

// ============================================================================
// Provisioning
// ============================================================================

/// Ordered provisioning steps; each runs only if every earlier one succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningStep {
    Namespace,
    ServiceAccount,
    Role,
    RoleBindings,
    ImageStreams,
    DeploymentConfig,
    CustomResource,
}

impl ProvisioningStep {
    pub const ALL: [ProvisioningStep; 7] = [
        ProvisioningStep::Namespace,
        ProvisioningStep::ServiceAccount,
        ProvisioningStep::Role,
        ProvisioningStep::RoleBindings,
        ProvisioningStep::ImageStreams,
        ProvisioningStep::DeploymentConfig,
        ProvisioningStep::CustomResource,
    ];

    /// Prefix attached to the error of a failed step.
    ///
    /// `None` for the steps whose individual bindings or image streams
    /// already name themselves in the error.
    pub fn failure_message(&self) -> Option<&'static str> {
        match self {
            ProvisioningStep::Namespace => Some("failed to create namespace for fuse service"),
            ProvisioningStep::ServiceAccount => Some("failed to create service account for fuse service"),
            ProvisioningStep::Role => Some("failed to create role for fuse service"),
            ProvisioningStep::RoleBindings | ProvisioningStep::ImageStreams => None,
            ProvisioningStep::DeploymentConfig => Some("failed to create deployment config for fuse service"),
            ProvisioningStep::CustomResource => Some("failed to create a fuse custom resource"),
        }
    }

    /// Attach this step's prefix, if it has one, to a step result
    pub fn wrap<T>(&self, result: anyhow::Result<T>) -> anyhow::Result<T> {
        match self.failure_message() {
            Some(message) => result.context(message),
            None => result,
        }
    }
}

impl std::fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProvisioningStep::Namespace => "namespace",
            ProvisioningStep::ServiceAccount => "service-account",
            ProvisioningStep::Role => "role",
            ProvisioningStep::RoleBindings => "role-bindings",
            ProvisioningStep::ImageStreams => "image-streams",
            ProvisioningStep::DeploymentConfig => "deployment-config",
            ProvisioningStep::CustomResource => "custom-resource",
        };
        f.write_str(name)
    }
}

/// Rejected caller parameter
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid parameter '{name}': {message}")]
pub struct ParameterError {
    pub name: String,
    pub message: String,
}

/// Typed view of the free-form provision parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionParameters {
    /// Maximum number of integrations the instance may run (0 when unset)
    pub integration_limit: u32,
}

impl ProvisionParameters {
    pub const LIMIT: &'static str = "limit";

    /// Parse caller parameters; a `limit` that is not a non-negative integer is rejected
    pub fn from_map(parameters: &Map<String, Value>) -> Result<Self, ParameterError> {
        let integration_limit = match parameters.get(Self::LIMIT) {
            None | Some(Value::Null) => 0,
            Some(Value::Number(number)) => {
                let limit = match number.as_u64() {
                    Some(value) => u32::try_from(value).ok(),
                    None => number
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                        .map(|f| f as u32),
                };
                limit.ok_or_else(|| ParameterError {
                    name: Self::LIMIT.to_string(),
                    message: format!("expected a non-negative integer, got {}", number),
                })?
            }
            Some(other) => {
                return Err(ParameterError {
                    name: Self::LIMIT.to_string(),
                    message: format!("expected a non-negative integer, got {}", other),
                })
            }
        };

        Ok(Self { integration_limit })
    }
}

/// Caller-facing provisioning failure
#[derive(Debug, Error)]
#[error("{}", describe_error(.cause))]
pub struct ProvisionError {
    /// HTTP-style status code for the broker host
    pub code: u16,
    pub cause: anyhow::Error,
}

impl ProvisionError {
    pub fn bad_request(cause: impl Into<anyhow::Error>) -> Self {
        Self { code: 400, cause: cause.into() }
    }

    pub fn internal(cause: impl Into<anyhow::Error>) -> Self {
        Self { code: 500, cause: cause.into() }
    }
}

// ============================================================================
// Last Operation
// ============================================================================

/// Status of a deploy or remove operation, recomputed on every poll
#[derive(Debug)]
pub struct OperationStatus {
    pub state: OperationState,
    pub description: String,
    /// Underlying error, when one was observed and not masked
    pub cause: Option<anyhow::Error>,
}

impl OperationStatus {
    pub fn succeeded(description: impl Into<String>) -> Self {
        Self::new(OperationState::Succeeded, description)
    }

    pub fn in_progress(description: impl Into<String>) -> Self {
        Self::new(OperationState::InProgress, description)
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self::new(OperationState::Failed, description)
    }

    fn new(state: OperationState, description: impl Into<String>) -> Self {
        Self {
            state,
            description: description.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn is_succeeded(&self) -> bool {
        self.state == OperationState::Succeeded
    }

    pub fn to_response(&self) -> LastOperationResponse {
        LastOperationResponse {
            state: self.state,
            description: self.description.clone(),
        }
    }
}
