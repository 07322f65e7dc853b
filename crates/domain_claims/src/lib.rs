//! Claims Domain
//!
//! This crate owns the claim as it enters the adjudication pipeline: the
//! immutable [`ClaimRecord`] and the loader that validates a submitted claim
//! document into one.
//!
//! # Claim intake
//!
//! ```text
//! JSON document -> ClaimLoader (validate, alias legacy fields) -> ClaimRecord
//!                                   \-> ClaimError::Validation { field }
//! ```

pub mod claim;
pub mod loader;
pub mod error;

pub use claim::{ClaimRecord, UsageType};
pub use loader::ClaimLoader;
pub use error::ClaimError;
