use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};

use pixelforge_core::PageRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Completed generations, newest first.
pub async fn list_generations(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListGenerationsQuery>,
) -> axum::response::Response {
    let page = PageRequest::from_params(query.limit, query.offset);

    match services.jobs.list_generations(page).await {
        Ok(page) => {
            Json(dto::page_to_json("generations", &page, dto::generation_to_json)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
