use axum::{routing::get, Router};

pub mod generations;
pub mod jobs;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/jobs", jobs::router())
        .route("/generations", get(generations::list_generations))
}
