//! Request and response bodies
//!
//! Decisions are returned as the domain `ClaimDecision` itself; only views
//! that reshape domain types live here.

pub mod health;
pub mod policy;
