//! Policy domain errors

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur while resolving or reading policy declarations
#[derive(Debug, Error)]
pub enum PolicyError {
    /// No declarations exist for the policy in any source
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// A declarations document could not be interpreted
    #[error("Malformed declarations: {0}")]
    MalformedDeclarations(String),

    /// A declarations source failed
    #[error("Declarations source error: {0}")]
    Port(#[from] PortError),
}

impl PolicyError {
    pub fn not_found(policy_number: impl std::fmt::Display) -> Self {
        PolicyError::PolicyNotFound(policy_number.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        PolicyError::MalformedDeclarations(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PolicyError::PolicyNotFound(_))
    }
}
