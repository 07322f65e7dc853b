//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use crate::dto::health::{HealthResponse, ReadinessResponse};
use crate::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check (includes the declarations store)
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    let resolver = state.pipeline.resolver();
    let policies = resolver
        .local_store()
        .policy_numbers()
        .await
        .map_err(|e| {
            warn!(error = %e, "Declarations store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    Ok(Json(ReadinessResponse {
        status: "ready".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        policies: policies.len(),
        reasoning: state.pipeline.reasoning_collaborator().map(str::to_string),
        retrieval: resolver.retriever().map(|r| r.name().to_string()),
    }))
}
