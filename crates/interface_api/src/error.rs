//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use domain_adjudication::PipelineError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Validation { message, field } => (
                "validation_error",
                message,
                field.map(|f| vec![format!("field: {}", f)]),
            ),
            ApiError::Timeout(msg) => ("timeout", msg, None),
            ApiError::Internal(msg) => ("internal_error", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::Validation(claim_error) => ApiError::Validation {
                field: claim_error.field().map(str::to_string),
                message: err.to_string(),
            },
            PipelineError::PolicyNotFound(_) => ApiError::NotFound(err.to_string()),
            PipelineError::Cancelled(_) => ApiError::Timeout(err.to_string()),
            PipelineError::Policy(_) | PipelineError::Incomplete(_) => {
                error!(error = %err, "Claim pipeline failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_claims::ClaimError;

    #[test]
    fn test_pipeline_error_status_mapping() {
        let cases = [
            (PipelineError::from(ClaimError::missing("claim_number")), StatusCode::UNPROCESSABLE_ENTITY),
            (PipelineError::PolicyNotFound("CAPA-1".into()), StatusCode::NOT_FOUND),
            (PipelineError::cancelled("fraud_radar"), StatusCode::GATEWAY_TIMEOUT),
            (PipelineError::incomplete("missing settlement"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_validation_keeps_field() {
        let err = ApiError::from(PipelineError::from(ClaimError::missing("date_of_loss")));
        match err {
            ApiError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("date_of_loss")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
