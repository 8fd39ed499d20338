//! In-memory store implementations.
//!
//! The canonical backing store for this service. Both types keep their data
//! behind a single lock and apply every mutation while holding it, which
//! gives the single-row atomic update semantics the processor relies on.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use pixelforge_core::{Generation, Job, JobId, JobStatus, PageRequest, StatusUpdate};

use super::{GenerationArchive, JobStore, StoreError};

/// In-memory job table.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.get(&id).cloned())
    }

    async fn update_status(&self, id: JobId, update: StatusUpdate) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.apply(update);
        Ok(job.clone())
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Job>, usize), StoreError> {
        let jobs = self.jobs.read().unwrap();
        let mut matching: Vec<_> = jobs
            .values()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();

        // Newest first; id as a tiebreak for stable paging.
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        let total = matching.len();
        let rows = matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Ok((rows, total))
    }
}

/// In-memory append-only generation archive.
#[derive(Debug, Default)]
pub struct InMemoryGenerationArchive {
    generations: RwLock<Vec<Generation>>,
}

impl InMemoryGenerationArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl GenerationArchive for InMemoryGenerationArchive {
    async fn append(&self, generation: Generation) -> Result<(), StoreError> {
        let mut generations = self.generations.write().unwrap();
        // One record per job; later appends for the same job are no-ops.
        if generations.iter().any(|g| g.job_id == generation.job_id) {
            return Ok(());
        }
        generations.push(generation);
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<Generation>, usize), StoreError> {
        let generations = self.generations.read().unwrap();
        let mut rows: Vec<_> = generations.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = rows.len();
        let rows = rows
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Ok((rows, total))
    }
}
