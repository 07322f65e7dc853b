//! Policy Domain
//!
//! Declarations pages and the rules for finding the one that governs a claim.
//!
//! # Architecture
//!
//! - **Value Objects**: `PolicyDeclarations`, `Coverage`, `Endorsement`
//! - **Parser**: semi-structured declarations text to `PolicyDeclarations`
//! - **Ports**: `DeclarationsPort` (local store), `PolicyRetriever` (document index)
//! - **Resolver**: `PolicyContextResolver`, retrieval first, then local store
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use domain_policy::{DirectoryDeclarationsStore, PolicyContextResolver};
//!
//! let store = DirectoryDeclarationsStore::load("data/declarations")?;
//! let resolver = PolicyContextResolver::new(Arc::new(store));
//! let context = resolver.resolve(&policy_number).await?;
//! ```

pub mod coverage;
pub mod endorsement;
pub mod declarations;
pub mod parser;
pub mod store;
pub mod retrieval;
pub mod resolver;
pub mod error;
pub mod mock;

pub use coverage::{Coverage, CoverageType};
pub use endorsement::{Endorsement, EndorsementKind};
pub use declarations::{LossPayee, PolicyDeclarations, PolicyPeriod};
pub use parser::DeclarationsParser;
pub use store::{DeclarationsPort, DirectoryDeclarationsStore, InMemoryDeclarationsStore};
pub use retrieval::{scoped_snippets, PolicyRetriever, PolicySnippet, RetrievalQuery};
pub use resolver::{DeclarationsSource, PolicyContext, PolicyContextResolver};
pub use error::PolicyError;
