//! Policy lookup handlers

use axum::{
    extract::{Path, State},
    Json,
};

use core_kernel::PolicyNumber;
use domain_policy::PolicyError;

use crate::dto::policy::PolicyResponse;
use crate::{error::ApiError, AppState};

/// Resolves the declarations for a policy the same way a claim would
pub async fn get_policy(
    State(state): State<AppState>,
    Path(policy_number): Path<String>,
) -> Result<Json<PolicyResponse>, ApiError> {
    let policy_number =
        PolicyNumber::new(&policy_number).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    match state.pipeline.resolver().resolve(&policy_number).await {
        Ok(context) => Ok(Json(PolicyResponse::from(context))),
        Err(e @ PolicyError::PolicyNotFound(_)) => Err(ApiError::NotFound(e.to_string())),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}
