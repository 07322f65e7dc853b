//! Test Utilities Crate
//!
//! Shared fixtures and helpers for the claim adjudication test suite.
//!
//! # Modules
//!
//! - `fixtures`: sample claims and declarations pages
//! - `builders`: builders for claim documents and declarations text
//! - `assertions`: assertion helpers for decisions
//! - `generators`: property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
