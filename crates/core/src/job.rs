//! The job entity, its status machine, and the generation record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{GenerationId, JobId};
use crate::model::ImageModel;

/// Job execution status.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, waiting for a worker to pick it up.
    Pending,
    /// A worker is currently synthesizing the artifact.
    Processing,
    /// Artifact produced and stored; `result_url` is set.
    Completed,
    /// Last attempt failed; `error` is set. The queue may redeliver.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl core::str::FromStr for JobStatus {
    type Err = crate::error::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(crate::error::DomainError::validation(format!(
                "unknown status '{other}': must be one of pending, processing, completed, failed"
            ))),
        }
    }
}

/// A status transition requested against a job row.
///
/// Transitions are applied atomically by the store; see [`Job::apply`] for
/// the acceptance rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Processing,
    Completed { result_url: String },
    Failed { error: String },
}

/// One request for an asynchronously produced image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub prompt: String,
    pub model: ImageModel,
    /// Public reference to the stored artifact. Set iff `Completed`.
    pub result_url: Option<String>,
    /// Human-readable failure detail. Set iff `Failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a pending job with matching created/updated timestamps.
    pub fn new(id: JobId, prompt: impl Into<String>, model: ImageModel) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            prompt: prompt.into(),
            model,
            result_url: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status transition. Returns `true` if the row changed.
    ///
    /// Rules, per delivery attempt rather than per job:
    /// - a `Completed` job never changes again (re-delivery is a no-op);
    /// - `Failed -> Processing` is a valid re-entry (at-least-once retry);
    /// - re-applying the current state refreshes `updated_at` only as part
    ///   of an accepted write; identical repeats are harmless.
    ///
    /// Accepted writes are last-write-wins on
    /// (status, result_url, error, updated_at).
    pub fn apply(&mut self, update: StatusUpdate) -> bool {
        if self.status == JobStatus::Completed {
            return false;
        }

        match update {
            StatusUpdate::Processing => {
                self.status = JobStatus::Processing;
                self.error = None;
            }
            StatusUpdate::Completed { result_url } => {
                self.status = JobStatus::Completed;
                self.result_url = Some(result_url);
                self.error = None;
            }
            StatusUpdate::Failed { error } => {
                self.status = JobStatus::Failed;
                self.result_url = None;
                self.error = Some(error);
            }
        }
        self.updated_at = Utc::now();
        true
    }
}

/// Immutable record of one completed artifact.
///
/// References its job by identifier only; deleting the job (an external
/// retention concern) never cascades here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub id: GenerationId,
    pub job_id: JobId,
    pub result_url: String,
    pub prompt: String,
    pub model: ImageModel,
    pub created_at: DateTime<Utc>,
}

impl Generation {
    pub fn new(
        job_id: JobId,
        result_url: impl Into<String>,
        prompt: impl Into<String>,
        model: ImageModel,
    ) -> Self {
        Self {
            id: GenerationId::new(),
            job_id,
            result_url: result_url.into(),
            prompt: prompt.into(),
            model,
            created_at: Utc::now(),
        }
    }
}

/// The message dispatched to trigger background processing of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub job_id: JobId,
    pub prompt: String,
    pub model: ImageModel,
}
