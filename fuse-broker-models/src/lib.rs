use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State of an asynchronous broker operation, as reported to the broker host
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationState {
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "failed")]
    Failed,
}

impl OperationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::Succeeded => "succeeded",
            OperationState::InProgress => "in progress",
            OperationState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body for a last_operation poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LastOperationResponse {
    pub state: OperationState,
    pub description: String,
}

/// Response from provisioning a service instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateServiceInstanceResponse {
    /// HTTP-style status code (202 when provisioning was accepted)
    #[serde(skip)]
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

/// Response from deprovisioning a service instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteServiceInstanceResponse {
    pub operation: String,
}

/// Platform context sent by the broker host with each provision request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContextProfile {
    #[serde(default)]
    pub platform: String,
    /// Namespace the request originated from
    #[serde(default)]
    pub namespace: String,
}

/// Identity of the user that requested the operation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Request body for provisioning a service instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProvisionRequest {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub context: ContextProfile,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub free: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetadata {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// A service offered by the broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    #[serde(default)]
    pub plan_updateable: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ServiceMetadata>,
    pub plans: Vec<ServicePlan>,
}

/// Response body for GET /v2/catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub services: Vec<Service>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_state_uses_broker_wire_values() {
        let json = serde_json::to_string(&OperationState::InProgress).unwrap();
        assert_eq!(json, "\"in progress\"");

        let parsed: OperationState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, OperationState::Failed);
        assert_eq!(OperationState::Succeeded.to_string(), "succeeded");
    }

    #[test]
    fn test_provision_request_defaults_context_and_parameters() {
        let request: ProvisionRequest = serde_json::from_str(
            r#"{"service_id": "fuse-service-id", "plan_id": "default-fuse"}"#,
        )
        .unwrap();

        assert_eq!(request.context, ContextProfile::default());
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_create_response_hides_code() {
        let response = CreateServiceInstanceResponse {
            code: 202,
            dashboard_url: Some("https://fuse-abc123".to_string()),
            operation: Some("deploy".to_string()),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"dashboard_url": "https://fuse-abc123", "operation": "deploy"})
        );
    }
}
