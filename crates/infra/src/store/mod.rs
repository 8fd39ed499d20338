//! Job store and generation archive abstractions.

use async_trait::async_trait;

use pixelforge_core::{Generation, Job, JobId, JobStatus, PageRequest, StatusUpdate};

mod in_memory;

pub use in_memory::{InMemoryGenerationArchive, InMemoryJobStore};

/// Store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Persistent table of job records; the source of truth for status.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a freshly created job. The id must be new.
    async fn insert(&self, job: Job) -> Result<(), StoreError>;

    /// Fetch a job by id. A miss is `Ok(None)`, not an error.
    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Apply a status transition atomically (single-row read-modify-write)
    /// and return the row as written. `NotFound` if the id is absent.
    ///
    /// Transitions rejected by the status machine (e.g. writes against a
    /// completed job) leave the row untouched; the unchanged row is
    /// returned so callers can observe the final state.
    async fn update_status(&self, id: JobId, update: StatusUpdate) -> Result<Job, StoreError>;

    /// List jobs, optionally filtered by status, newest first.
    /// Returns the page of rows plus the total matching count.
    async fn list(
        &self,
        status: Option<JobStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Job>, usize), StoreError>;
}

/// Append-only archive of completed generations, decoupled from the job
/// lifecycle for fast historical queries.
#[async_trait]
pub trait GenerationArchive: Send + Sync {
    /// Append one immutable record. At most one record per job is
    /// retained; appending again for the same `job_id` is a no-op, so
    /// redeliveries cannot duplicate history.
    async fn append(&self, generation: Generation) -> Result<(), StoreError>;

    /// List records newest first; returns the page plus the total count.
    async fn list(&self, page: PageRequest) -> Result<(Vec<Generation>, usize), StoreError>;
}
