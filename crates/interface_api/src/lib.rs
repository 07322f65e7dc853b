//! HTTP API Layer
//!
//! Exposes the claim adjudication pipeline over REST using Axum, plus the
//! wiring shared by the server and CLI binaries.
//!
//! # Architecture
//!
//! - **Handlers**: decisions, policy lookup, health
//! - **Middleware**: tracing and audit logging
//! - **DTOs**: request/response bodies that are not domain types
//! - **Error Handling**: pipeline errors mapped onto HTTP status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{build_pipeline, create_router, config::AppConfig};
//!
//! let config = AppConfig::from_env()?;
//! let pipeline = build_pipeline(&config)?;
//! let app = create_router(pipeline, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod cli;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use domain_adjudication::ClaimPipeline;
use domain_policy::{DirectoryDeclarationsStore, PolicyContextResolver};
use infra_external::{HttpRetrievalClient, OpenAiCompatibleClient};

use crate::config::AppConfig;
use crate::handlers::{decisions, health, policies};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ClaimPipeline>,
    pub config: Arc<AppConfig>,
}

/// Creates the main API router
pub fn create_router(pipeline: ClaimPipeline, config: AppConfig) -> Router {
    router_with_state(AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config),
    })
}

/// Creates the router around existing shared state
pub fn router_with_state(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let api_routes = Router::new()
        .route("/claims/decisions", post(decisions::decide_claim))
        .route("/policies/:policy_number", get(policies::get_policy))
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wires the pipeline described by `config`
///
/// Declarations always come from `declarations_dir`. The retrieval and
/// reasoning collaborators are attached only when configured; without them
/// every stage runs on its deterministic rules.
pub fn build_pipeline(config: &AppConfig) -> anyhow::Result<ClaimPipeline> {
    let store = DirectoryDeclarationsStore::load(&config.declarations_dir).with_context(|| {
        format!(
            "failed to load declarations from {}",
            config.declarations_dir.display()
        )
    })?;

    let mut resolver = PolicyContextResolver::new(Arc::new(store))
        .with_retry_policy(config.pipeline.retry);
    if let Some(retrieval) = &config.retrieval {
        let client = HttpRetrievalClient::new(retrieval.service_config())
            .context("failed to build retrieval client")?;
        info!(base_url = %retrieval.base_url, "Retrieval collaborator configured");
        resolver = resolver.with_retriever(Arc::new(client));
    }

    let mut pipeline = ClaimPipeline::new(resolver, config.pipeline.clone());
    if let Some(reasoning) = &config.reasoning {
        let client = OpenAiCompatibleClient::new(reasoning.service_config(), &reasoning.model)
            .context("failed to build reasoning client")?;
        info!(
            base_url = %reasoning.base_url,
            model = %reasoning.model,
            "Reasoning collaborator configured"
        );
        pipeline = pipeline.with_reasoning_client(Arc::new(client));
    }

    Ok(pipeline)
}
