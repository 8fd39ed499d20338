use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pixelforge_core::DomainError;
use pixelforge_infra::WaitError;

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Dispatch(msg) => json_error(StatusCode::BAD_GATEWAY, "dispatch_error", msg),
        DomainError::Processing(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "processing_error", msg)
        }
    }
}

/// Wait failures carry structure (which ids are missing, failed, or still
/// pending) beyond the flat error envelope, so they get their own mapper.
pub fn wait_error_to_response(err: WaitError) -> axum::response::Response {
    match err {
        WaitError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        WaitError::NotFound { missing } => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({
                "error": "not_found",
                "message": "one or more jobs do not exist",
                "missing_job_ids": missing.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        WaitError::JobsFailed {
            failures,
            completed,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            axum::Json(json!({
                "error": "jobs_failed",
                "message": "one or more jobs failed",
                "failures": failures
                    .iter()
                    .map(|(id, reason)| json!({"job_id": id.to_string(), "error": reason}))
                    .collect::<Vec<_>>(),
                "completed": completed
                    .iter()
                    .map(|r| json!({"job_id": r.job_id.to_string(), "result_url": r.result_url}))
                    .collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        WaitError::Timeout { pending, waited } => (
            StatusCode::REQUEST_TIMEOUT,
            axum::Json(json!({
                "error": "timeout",
                "message": format!("timed out after {}s with jobs still in flight", waited.as_secs()),
                "pending_job_ids": pending.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        WaitError::Store(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
