//! External Collaborator Adapters
//!
//! HTTP implementations of the two collaborator ports:
//!
//! - [`OpenAiCompatibleClient`] implements `ReasoningClient` against any
//!   OpenAI-compatible chat completion endpoint
//! - [`HttpRetrievalClient`] implements `PolicyRetriever` against a
//!   document index
//!
//! Both map HTTP failures onto `PortError`, so transient failures are
//! retried once by the caller and everything else degrades to the local
//! fallback.
//!
//! # Example
//!
//! ```rust,ignore
//! use core_kernel::ExternalServiceConfig;
//! use infra_external::OpenAiCompatibleClient;
//!
//! let config = ExternalServiceConfig::new("https://llm.example.com").with_api_key(key);
//! let client = OpenAiCompatibleClient::new(config, "gpt-4o-mini")?;
//! let pipeline = pipeline.with_reasoning_client(Arc::new(client));
//! ```

mod http;
pub mod reasoning;
pub mod retrieval;

pub use reasoning::OpenAiCompatibleClient;
pub use retrieval::HttpRetrievalClient;
