//! Job creation and read-side queries.

use std::sync::Arc;

use tracing::{error, info};

use pixelforge_core::{
    validate, DomainError, DomainResult, Generation, ImageModel, Job, JobId, JobStatus, Page,
    PageRequest, WorkUnit,
};

use crate::queue::WorkDispatcher;
use crate::store::{GenerationArchive, JobStore};

/// Validated creation request.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub prompt: String,
    pub model: ImageModel,
    pub count: usize,
}

impl CreateRequest {
    /// Validate raw inputs, applying defaults for model and count.
    pub fn new(
        prompt: impl Into<String>,
        model: Option<ImageModel>,
        count: Option<usize>,
    ) -> DomainResult<Self> {
        let prompt = prompt.into();
        validate::validate_prompt(&prompt)?;
        let count = count.unwrap_or(1);
        validate::validate_count(count)?;
        Ok(Self {
            prompt,
            model: model.unwrap_or_default(),
            count,
        })
    }
}

/// Front door for job creation, status lookups, and history listings.
pub struct JobService {
    store: Arc<dyn JobStore>,
    archive: Arc<dyn GenerationArchive>,
    dispatcher: Arc<dyn WorkDispatcher>,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        archive: Arc<dyn GenerationArchive>,
        dispatcher: Arc<dyn WorkDispatcher>,
    ) -> Self {
        Self {
            store,
            archive,
            dispatcher,
        }
    }

    /// Create `count` replica jobs and dispatch one work unit per replica.
    ///
    /// Returns the ordered ids. If a dispatch fails after its row was
    /// inserted, the job stays `pending` with no work unit behind it — a
    /// known gap with no automatic reconciliation; the error is surfaced
    /// so the caller can see which call went bad.
    pub async fn create(&self, request: CreateRequest) -> DomainResult<Vec<JobId>> {
        let mut ids = Vec::with_capacity(request.count);

        for _ in 0..request.count {
            let id = JobId::new();
            let job = Job::new(id, request.prompt.clone(), request.model);

            self.store
                .insert(job)
                .await
                .map_err(|e| DomainError::processing(e.to_string()))?;

            let unit = WorkUnit {
                job_id: id,
                prompt: request.prompt.clone(),
                model: request.model,
            };
            if let Err(e) = self.dispatcher.send(unit).await {
                error!(job_id = %id, error = %e, "dispatch failed after insert; job left pending");
                return Err(DomainError::dispatch(format!(
                    "job {id} was created but could not be queued: {e}"
                )));
            }

            ids.push(id);
        }

        info!(count = ids.len(), model = %request.model, "jobs created");
        Ok(ids)
    }

    /// Look up one job; a miss is a `NotFound` error, not a defect.
    pub async fn get_status(&self, id: JobId) -> DomainResult<Job> {
        self.store
            .get(id)
            .await
            .map_err(|e| DomainError::processing(e.to_string()))?
            .ok_or_else(|| DomainError::not_found(format!("job {id}")))
    }

    /// List jobs, optionally filtered by status, newest first.
    pub async fn list_jobs(
        &self,
        status: Option<JobStatus>,
        page: PageRequest,
    ) -> DomainResult<Page<Job>> {
        let (rows, total) = self
            .store
            .list(status, page)
            .await
            .map_err(|e| DomainError::processing(e.to_string()))?;
        Ok(Page::new(rows, total, page))
    }

    /// List completed generations, newest first.
    pub async fn list_generations(&self, page: PageRequest) -> DomainResult<Page<Generation>> {
        let (rows, total) = self
            .archive
            .list(page)
            .await
            .map_err(|e| DomainError::processing(e.to_string()))?;
        Ok(Page::new(rows, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::queue::{InMemoryWorkConsumer, InMemoryWorkQueue, QueueError};
    use crate::store::{InMemoryGenerationArchive, InMemoryJobStore};

    fn service() -> (Arc<InMemoryJobStore>, JobService, InMemoryWorkConsumer) {
        let store = InMemoryJobStore::arc();
        let archive = InMemoryGenerationArchive::arc();
        let (queue, consumer) = InMemoryWorkQueue::new(3);
        let service = JobService::new(store.clone(), archive, queue);
        (store, service, consumer)
    }

    #[tokio::test]
    async fn create_single_job_inserts_pending_row() {
        let (store, service, _consumer) = service();
        let request = CreateRequest::new("a red apple", None, None).unwrap();

        let ids = service.create(request).await.unwrap();
        assert_eq!(ids.len(), 1);

        let job = store.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.prompt, "a red apple");
        assert_eq!(job.model, ImageModel::Fast);
        assert_eq!(job.created_at, job.updated_at);
    }

    #[tokio::test]
    async fn create_replicas_returns_ordered_distinct_ids() {
        let (store, service, _consumer) = service();
        let request =
            CreateRequest::new("three apples", Some(ImageModel::Quality), Some(3)).unwrap();

        let ids = service.create(request).await.unwrap();
        assert_eq!(ids.len(), 3);
        for window in ids.windows(2) {
            assert_ne!(window[0], window[1]);
        }
        for id in &ids {
            let job = store.get(*id).await.unwrap().unwrap();
            assert_eq!(job.model, ImageModel::Quality);
        }
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_without_side_effects() {
        let (store, _service, _consumer) = service();
        assert!(matches!(
            CreateRequest::new("", None, None),
            Err(DomainError::Validation(_))
        ));
        let (_, total) = store.list(None, PageRequest::default()).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn count_out_of_bounds_is_rejected() {
        assert!(CreateRequest::new("p", None, Some(0)).is_err());
        assert!(CreateRequest::new("p", None, Some(21)).is_err());
        assert!(CreateRequest::new("p", None, Some(20)).is_ok());
    }

    #[tokio::test]
    async fn get_status_miss_is_not_found() {
        let (_store, service, _consumer) = service();
        assert!(matches!(
            service.get_status(JobId::new()).await,
            Err(DomainError::NotFound(_))
        ));
    }

    struct BrokenDispatcher;

    #[async_trait]
    impl WorkDispatcher for BrokenDispatcher {
        async fn send(&self, _unit: WorkUnit) -> Result<(), QueueError> {
            Err(QueueError::Transport("queue is down".into()))
        }
    }

    #[tokio::test]
    async fn dispatch_failure_leaves_pending_row() {
        let store = InMemoryJobStore::arc();
        let archive = InMemoryGenerationArchive::arc();
        let service = JobService::new(store.clone(), archive, Arc::new(BrokenDispatcher));

        let request = CreateRequest::new("stuck", None, None).unwrap();
        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Dispatch(_)));

        // The orphaned row is visible as pending.
        let (rows, total) = store.list(None, PageRequest::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn list_jobs_pages_with_totals() {
        let (_store, service, _consumer) = service();
        for i in 0..7 {
            let request = CreateRequest::new(format!("p{i}"), None, None).unwrap();
            service.create(request).await.unwrap();
        }

        let page = service
            .list_jobs(None, PageRequest::from_params(Some(5), None))
            .await
            .unwrap();
        assert_eq!(page.total, 7);
        assert_eq!(page.returned(), 5);
        assert!(page.has_more());

        let page = service
            .list_jobs(None, PageRequest::from_params(Some(5), Some(5)))
            .await
            .unwrap();
        assert_eq!(page.returned(), 2);
        assert!(!page.has_more());
    }
}
