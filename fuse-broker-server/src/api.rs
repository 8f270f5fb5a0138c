use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use fuse_broker_models::{
    Catalog, CreateServiceInstanceResponse, DeleteServiceInstanceResponse, LastOperationResponse,
    ProvisionRequest,
};
use fuse_broker_orchestrations::k8s_client::{describe_error, ClusterClient};
use fuse_broker_orchestrations::names::operations;
use fuse_broker_orchestrations::registry::DeployerRegistry;
use fuse_broker_orchestrations::Deployer;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::identity::{parse_originating_identity, ORIGINATING_IDENTITY_HEADER};

/// Shared API state
#[derive(Clone)]
pub struct AppState {
    pub registry: DeployerRegistry,
    pub cluster: Arc<dyn ClusterClient>,
    pub broker_namespace: String,
}

impl AppState {
    fn deployer(&self, service_id: Option<&str>) -> Result<Arc<dyn Deployer>, AppError> {
        let service_id = service_id
            .ok_or_else(|| AppError::BadRequest("service_id is required".to_string()))?;
        self.registry
            .find(service_id)
            .ok_or_else(|| AppError::BadRequest(format!("unknown service: {}", service_id)))
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/v2/catalog", get(catalog))
        .route(
            "/v2/service_instances/:instance_id",
            put(provision).delete(deprovision),
        )
        .route(
            "/v2/service_instances/:instance_id/last_operation",
            get(last_operation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server
pub async fn start_server(host: &str, port: u16, state: AppState) -> Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("✓ Broker API listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

// ============================================================================
// Health Check
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "fuse-broker",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ============================================================================
// Catalog
// ============================================================================

async fn catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.registry.catalog())
}

// ============================================================================
// Service Instances
// ============================================================================

async fn provision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<CreateServiceInstanceResponse>), AppError> {
    let deployer = state.deployer(Some(&request.service_id))?;

    let identity = headers
        .get(ORIGINATING_IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing originating identity".to_string()))?;
    let user = parse_originating_identity(identity)
        .map_err(|e| AppError::BadRequest(format!("{:#}", e)))?;

    let response = deployer
        .deploy(
            &instance_id,
            &state.broker_namespace,
            &request.context,
            &request.parameters,
            &user,
            state.cluster.as_ref(),
        )
        .await
        .map_err(|e| AppError::Status(status_code(e.code), e.to_string()))?;

    Ok((status_code(response.code), Json(response)))
}

#[derive(Debug, Deserialize)]
struct DeprovisionQuery {
    service_id: Option<String>,
}

async fn deprovision(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<DeprovisionQuery>,
) -> Result<(StatusCode, Json<DeleteServiceInstanceResponse>), AppError> {
    let deployer = state.deployer(query.service_id.as_deref())?;

    deployer
        .remove_deploy(&instance_id, &state.broker_namespace, state.cluster.as_ref())
        .await
        .map_err(|e| AppError::Internal(describe_error(&e)))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DeleteServiceInstanceResponse {
            operation: operations::REMOVE.to_string(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
struct LastOperationQuery {
    service_id: Option<String>,
    operation: Option<String>,
}

async fn last_operation(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
) -> Result<Json<LastOperationResponse>, AppError> {
    let deployer = state.deployer(query.service_id.as_deref())?;
    let operation = query.operation.unwrap_or_default();

    let status = deployer
        .last_operation(&instance_id, &operation, state.cluster.as_ref())
        .await;

    if let Some(cause) = &status.cause {
        tracing::warn!(
            instance_id = %instance_id,
            operation = %operation,
            state = %status.state,
            "Last operation check observed an error: {}",
            describe_error(cause)
        );
    }

    Ok(Json(status.to_response()))
}

fn status_code(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
    Status(StatusCode, String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Status(status, msg) => (status, msg),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", message);
        }

        let body = Json(serde_json::json!({
            "description": message
        }));

        (status, body).into_response()
    }
}
