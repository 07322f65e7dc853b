//! Core Kernel - Foundational types shared by the claim adjudication crates
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Business codes and generated identifiers
//! - Port error taxonomy and retry policy for external collaborators

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{BlankCodeError, ClaimNumber, DecisionId, PolicyNumber};
pub use ports::{AdapterHealth, DomainPort, ExternalServiceConfig, PortError, RetryPolicy};
