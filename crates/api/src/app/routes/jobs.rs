use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use pixelforge_core::{ImageModel, JobStatus, PageRequest};
use pixelforge_infra::CreateRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_job).get(list_jobs))
        .route("/wait", post(wait_for_jobs))
        .route("/create-and-wait", post(create_and_wait))
        .route("/:id", get(get_job))
}

pub async fn create_job(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateJobRequest>,
) -> axum::response::Response {
    let request = match build_create_request(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let ids = match services.jobs.create(request).await {
        Ok(ids) => ids,
        Err(e) => return errors::domain_error_to_response(e),
    };

    (StatusCode::CREATED, Json(created_body(&ids))).into_response()
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    match services.jobs.get_status(id).await {
        Ok(job) => Json(dto::job_to_json(&job)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListJobsQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => match s.parse::<JobStatus>() {
            Ok(v) => Some(v),
            Err(e) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string())
            }
        },
    };
    let page = PageRequest::from_params(query.limit, query.offset);

    match services.jobs.list_jobs(status, page).await {
        Ok(page) => Json(dto::page_to_json("jobs", &page, dto::job_to_json)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn wait_for_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::WaitRequest>,
) -> axum::response::Response {
    let target = match body.resolve() {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    match services.wait.wait_for(&target.ids).await {
        Ok(results) => Json(wait_body(&results, target.scalar)).into_response(),
        Err(e) => errors::wait_error_to_response(e),
    }
}

/// Create jobs and block until they all finish, in one round trip.
pub async fn create_and_wait(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateJobRequest>,
) -> axum::response::Response {
    let request = match build_create_request(body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let ids = match services.jobs.create(request).await {
        Ok(ids) => ids,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let scalar = ids.len() == 1;
    match services.wait.wait_for(&ids).await {
        Ok(results) => Json(wait_body(&results, scalar)).into_response(),
        Err(e) => errors::wait_error_to_response(e),
    }
}

fn build_create_request(
    body: dto::CreateJobRequest,
) -> Result<CreateRequest, axum::response::Response> {
    let model = match body.model.as_deref() {
        None => None,
        Some(s) => match s.parse::<ImageModel>() {
            Ok(m) => Some(m),
            Err(e) => {
                return Err(errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_model",
                    e.to_string(),
                ))
            }
        },
    };

    CreateRequest::new(body.prompt, model, body.count).map_err(errors::domain_error_to_response)
}

fn created_body(ids: &[pixelforge_core::JobId]) -> serde_json::Value {
    if let [id] = ids {
        serde_json::json!({
            "job_id": id.to_string(),
            "status": "pending",
        })
    } else {
        serde_json::json!({
            "job_ids": ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            "count": ids.len(),
            "status": "pending",
        })
    }
}

fn wait_body(results: &[pixelforge_infra::WaitResult], scalar: bool) -> serde_json::Value {
    if scalar {
        if let [only] = results {
            return serde_json::json!({
                "job_id": only.job_id.to_string(),
                "status": "completed",
                "result_url": only.result_url,
            });
        }
    }
    serde_json::json!({
        "jobs": results
            .iter()
            .map(|r| serde_json::json!({
                "job_id": r.job_id.to_string(),
                "status": "completed",
                "result_url": r.result_url,
            }))
            .collect::<Vec<_>>(),
        "count": results.len(),
    })
}
