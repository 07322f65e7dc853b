//! Health DTOs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub version: String,
    /// Policies available in the local declarations store
    pub policies: usize,
    /// Name of the reasoning collaborator, if one is configured
    pub reasoning: Option<String>,
    /// Name of the retrieval collaborator, if one is configured
    pub retrieval: Option<String>,
}
