use axum::http::StatusCode;
use serde::Deserialize;

use pixelforge_core::{Generation, Job, JobId, Page};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub prompt: String,
    /// One of: fast, balanced, quality. Defaults to fast.
    pub model: Option<String>,
    /// Replica count, 1..=20. Defaults to 1.
    pub count: Option<usize>,
}

/// Body of `POST /jobs/wait`. Exactly one of the two fields must be set;
/// `job_id` waits on a single job, `job_ids` on a batch.
#[derive(Debug, Deserialize)]
pub struct WaitRequest {
    pub job_id: Option<String>,
    pub job_ids: Option<Vec<String>>,
}

/// The resolved wait target, remembering whether the caller used the
/// scalar form (which gets a scalar response back).
#[derive(Debug)]
pub struct WaitTarget {
    pub ids: Vec<JobId>,
    pub scalar: bool,
}

impl WaitRequest {
    pub fn resolve(self) -> Result<WaitTarget, axum::response::Response> {
        let (raw, scalar) = match (self.job_id, self.job_ids) {
            (Some(id), None) => (vec![id], true),
            (None, Some(ids)) => (ids, false),
            _ => {
                return Err(errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "exactly one of job_id or job_ids must be provided",
                ))
            }
        };

        let mut ids = Vec::with_capacity(raw.len());
        for s in &raw {
            match s.parse::<JobId>() {
                Ok(id) => ids.push(id),
                Err(_) => {
                    return Err(errors::json_error(
                        StatusCode::BAD_REQUEST,
                        "invalid_id",
                        format!("invalid job id: {s}"),
                    ))
                }
            }
        }
        Ok(WaitTarget { ids, scalar })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ListGenerationsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn job_to_json(job: &Job) -> serde_json::Value {
    serde_json::json!({
        "job_id": job.id.to_string(),
        "status": job.status.as_str(),
        "prompt": job.prompt,
        "model": job.model.as_str(),
        "result_url": job.result_url,
        "error": job.error,
        "created_at": job.created_at.to_rfc3339(),
        "updated_at": job.updated_at.to_rfc3339(),
    })
}

pub fn generation_to_json(generation: &Generation) -> serde_json::Value {
    serde_json::json!({
        "id": generation.id.to_string(),
        "job_id": generation.job_id.to_string(),
        "result_url": generation.result_url,
        "prompt": generation.prompt,
        "model": generation.model.as_str(),
        "created_at": generation.created_at.to_rfc3339(),
    })
}

pub fn page_to_json<T>(
    key: &'static str,
    page: &Page<T>,
    map: impl Fn(&T) -> serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        key: page.items.iter().map(map).collect::<Vec<_>>(),
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
        "returned": page.returned(),
        "has_more": page.has_more(),
    })
}
