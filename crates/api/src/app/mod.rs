//! HTTP API application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: infrastructure wiring (store, queue, processor, worker)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use pixelforge_infra::{SynthesisError, WorkerHandle};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router plus the background worker handle
/// (public entrypoint used by `main.rs`).
pub async fn build_app(config: &ApiConfig) -> Result<(Router, WorkerHandle), SynthesisError> {
    let auth_state = middleware::AuthState {
        token: config.api_token.as_deref().map(Arc::from),
    };

    let (services, worker) = services::build_services(config).await?;

    // Protected routes: bearer token required (unless auth is disabled).
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let app = Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected);

    Ok((app, worker))
}
