//! Blocking "wait until terminal" semantics over the job store.
//!
//! There is no push channel from the processor to waiting callers; the
//! coordinator cooperatively polls the store on a timer and parks between
//! polls (`tokio::time::sleep`, never a busy spin). The deadline scales
//! with the batch size so a batched request is not timed out prematurely.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use pixelforge_core::{validate, JobId, JobStatus};

use crate::store::JobStore;

/// Wait timing knobs. Injectable so tests can run at millisecond scale.
#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    /// Fixed part of the deadline.
    pub base: Duration,
    /// Added to the deadline once per waited job.
    pub per_job: Duration,
    /// How often the store is re-queried.
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(60),
            per_job: Duration::from_secs(3),
            poll_interval: Duration::from_secs(3),
        }
    }
}

impl WaitConfig {
    /// Total budget for a batch of `n` jobs: `base + per_job × n`.
    pub fn budget_for(&self, n: usize) -> Duration {
        self.base + self.per_job * n as u32
    }
}

/// One successfully completed job in a wait outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    pub job_id: JobId,
    pub result_url: String,
}

/// Why a wait call did not return results.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WaitError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// At least one named id is absent from the store. Reported on the
    /// first poll; no further waiting happens.
    #[error("job(s) not found")]
    NotFound { missing: Vec<JobId> },

    /// At least one job failed. Jobs from the same batch that had already
    /// completed are carried along as partial results.
    #[error("job(s) failed")]
    JobsFailed {
        failures: Vec<(JobId, String)>,
        completed: Vec<WaitResult>,
    },

    /// Deadline elapsed with jobs still non-terminal. The jobs themselves
    /// are unaffected and may still complete later.
    #[error("timed out after {waited:?}")]
    Timeout {
        pending: Vec<JobId>,
        waited: Duration,
    },

    #[error("store error: {0}")]
    Store(String),
}

pub struct WaitCoordinator {
    store: Arc<dyn JobStore>,
    config: WaitConfig,
}

impl WaitCoordinator {
    pub fn new(store: Arc<dyn JobStore>, config: WaitConfig) -> Self {
        Self { store, config }
    }

    /// Block until every named job is terminal, or the scaled deadline
    /// elapses. Results come back in the order the ids were given.
    pub async fn wait_for(&self, ids: &[JobId]) -> Result<Vec<WaitResult>, WaitError> {
        validate::validate_wait_batch(ids.len())
            .map_err(|e| WaitError::Validation(e.to_string()))?;

        let started = Instant::now();
        let deadline = started + self.config.budget_for(ids.len());

        loop {
            let poll = self.poll_once(ids).await?;

            if !poll.missing.is_empty() {
                return Err(WaitError::NotFound {
                    missing: poll.missing,
                });
            }
            if !poll.failures.is_empty() {
                return Err(WaitError::JobsFailed {
                    failures: poll.failures,
                    completed: poll.completed,
                });
            }
            if poll.pending.is_empty() {
                return Ok(poll.completed);
            }

            if Instant::now() >= deadline {
                return Err(WaitError::Timeout {
                    pending: poll.pending,
                    waited: started.elapsed(),
                });
            }

            debug!(pending = poll.pending.len(), "jobs still in flight, parking");
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn poll_once(&self, ids: &[JobId]) -> Result<PollOutcome, WaitError> {
        let mut by_id = HashMap::with_capacity(ids.len());
        for id in ids {
            let job = self
                .store
                .get(*id)
                .await
                .map_err(|e| WaitError::Store(e.to_string()))?;
            by_id.insert(*id, job);
        }

        let mut outcome = PollOutcome::default();
        for id in ids {
            match by_id.get(id).and_then(|j| j.as_ref()) {
                None => outcome.missing.push(*id),
                Some(job) => match job.status {
                    JobStatus::Completed => outcome.completed.push(WaitResult {
                        job_id: *id,
                        result_url: job.result_url.clone().unwrap_or_default(),
                    }),
                    JobStatus::Failed => outcome.failures.push((
                        *id,
                        job.error
                            .clone()
                            .unwrap_or_else(|| "unknown failure".to_string()),
                    )),
                    JobStatus::Pending | JobStatus::Processing => outcome.pending.push(*id),
                },
            }
        }
        Ok(outcome)
    }
}

#[derive(Debug, Default)]
struct PollOutcome {
    missing: Vec<JobId>,
    failures: Vec<(JobId, String)>,
    completed: Vec<WaitResult>,
    pending: Vec<JobId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use pixelforge_core::{ImageModel, Job, StatusUpdate};

    use crate::store::{InMemoryJobStore, JobStore};

    fn fast_config() -> WaitConfig {
        WaitConfig {
            base: Duration::from_millis(100),
            per_job: Duration::from_millis(10),
            poll_interval: Duration::from_millis(20),
        }
    }

    async fn seed(store: &InMemoryJobStore, n: usize) -> Vec<JobId> {
        let mut ids = Vec::new();
        for i in 0..n {
            let job = Job::new(JobId::new(), format!("p{i}"), ImageModel::Fast);
            ids.push(job.id);
            store.insert(job).await.unwrap();
        }
        ids
    }

    async fn complete(store: &InMemoryJobStore, id: JobId, url: &str) {
        store
            .update_status(
                id,
                StatusUpdate::Completed {
                    result_url: url.into(),
                },
            )
            .await
            .unwrap();
    }

    #[test]
    fn budget_scales_with_batch_size() {
        let config = WaitConfig::default();
        assert_eq!(config.budget_for(1), Duration::from_secs(63));
        assert_eq!(config.budget_for(20), Duration::from_secs(120));

        let config = fast_config();
        assert_eq!(config.budget_for(3), Duration::from_millis(130));
    }

    #[tokio::test]
    async fn already_completed_jobs_return_immediately() {
        let store = InMemoryJobStore::arc();
        let ids = seed(&store, 3).await;
        for (i, id) in ids.iter().enumerate() {
            complete(&store, *id, &format!("u{i}")).await;
        }

        let coordinator = WaitCoordinator::new(store, fast_config());
        let results = coordinator.wait_for(&ids).await.unwrap();

        assert_eq!(results.len(), 3);
        // Order matches the input ids.
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.job_id, ids[i]);
            assert_eq!(result.result_url, format!("u{i}"));
        }
    }

    #[tokio::test]
    async fn completion_while_waiting_is_observed() {
        let store = InMemoryJobStore::arc();
        let ids = seed(&store, 1).await;

        let background = store.clone();
        let id = ids[0];
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            background
                .update_status(
                    id,
                    StatusUpdate::Completed {
                        result_url: "late".into(),
                    },
                )
                .await
                .unwrap();
        });

        let coordinator = WaitCoordinator::new(store, fast_config());
        let results = coordinator.wait_for(&ids).await.unwrap();
        assert_eq!(results[0].result_url, "late");
    }

    #[tokio::test]
    async fn missing_id_fails_fast_without_polling() {
        let store = InMemoryJobStore::arc();
        let mut ids = seed(&store, 2).await;
        let ghost = JobId::new();
        ids.push(ghost);

        let coordinator = WaitCoordinator::new(store, fast_config());
        let started = Instant::now();
        let err = coordinator.wait_for(&ids).await.unwrap_err();

        match err {
            WaitError::NotFound { missing } => assert_eq!(missing, vec![ghost]),
            other => panic!("expected NotFound, got {other:?}"),
        }
        // Well under one poll interval: the first poll already decided.
        assert!(started.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn failure_surfaces_with_partial_results() {
        let store = InMemoryJobStore::arc();
        let ids = seed(&store, 3).await;
        complete(&store, ids[0], "done").await;
        store
            .update_status(
                ids[1],
                StatusUpdate::Failed {
                    error: "synthesis exploded".into(),
                },
            )
            .await
            .unwrap();

        let coordinator = WaitCoordinator::new(store, fast_config());
        let err = coordinator.wait_for(&ids).await.unwrap_err();

        match err {
            WaitError::JobsFailed {
                failures,
                completed,
            } => {
                assert_eq!(failures, vec![(ids[1], "synthesis exploded".to_string())]);
                assert_eq!(
                    completed,
                    vec![WaitResult {
                        job_id: ids[0],
                        result_url: "done".into()
                    }]
                );
            }
            other => panic!("expected JobsFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_no_earlier_than_deadline_and_at_most_one_poll_late() {
        let store = InMemoryJobStore::arc();
        let ids = seed(&store, 2).await;

        let config = fast_config();
        let budget = config.budget_for(ids.len());
        let coordinator = WaitCoordinator::new(store, config);

        let started = Instant::now();
        let err = coordinator.wait_for(&ids).await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            WaitError::Timeout { pending, .. } => assert_eq!(pending.len(), 2),
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(elapsed >= budget, "returned before the deadline: {elapsed:?}");
        // One poll interval of slack, plus scheduling noise.
        assert!(
            elapsed < budget + config.poll_interval + Duration::from_millis(100),
            "returned too long after the deadline: {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected() {
        let store = InMemoryJobStore::arc();
        let coordinator = WaitCoordinator::new(store, fast_config());

        let ids: Vec<JobId> = (0..21).map(|_| JobId::new()).collect();
        assert!(matches!(
            coordinator.wait_for(&ids).await,
            Err(WaitError::Validation(_))
        ));
        assert!(matches!(
            coordinator.wait_for(&[]).await,
            Err(WaitError::Validation(_))
        ));
    }
}
