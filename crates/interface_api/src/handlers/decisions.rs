//! Claim decision handlers

use axum::{extract::State, Json};
use serde_json::Value;
use tracing::info;

use domain_adjudication::{CancellationToken, ClaimDecision, PipelineError};
use domain_claims::ClaimLoader;

use crate::{error::ApiError, AppState};

/// Runs one claim document through the pipeline
///
/// The run is cancelled once the configured request timeout elapses, which
/// surfaces as `504 Gateway Timeout` with no partial decision.
pub async fn decide_claim(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ClaimDecision>, ApiError> {
    let claim = ClaimLoader::from_value(body).map_err(PipelineError::from)?;

    let cancel = CancellationToken::new();
    let deadline = cancel.cancel_after(state.config.request_timeout());
    let result = state.pipeline.process_with_cancellation(claim, &cancel).await;
    deadline.abort();

    let decision = result?;
    info!(
        claim_number = %decision.claim.claim_number,
        determination = %decision.determination,
        payout = %decision.recommended_payout,
        "Decision issued"
    );
    Ok(Json(decision))
}
