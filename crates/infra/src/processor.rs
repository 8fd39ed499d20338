//! Background processing of one work unit.
//!
//! The processor is the only writer of job status after creation. Delivery
//! is at-least-once with no ordering or exclusivity guarantees, so every
//! step is written to be idempotent: re-marking `processing` is harmless,
//! an already-completed job is acked after making sure its archive record
//! exists, and a failed job re-enters `processing` on redelivery.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use pixelforge_core::{Generation, JobStatus, StatusUpdate, WorkUnit};

use crate::artifact::{ArtifactMetadata, ArtifactStore};
use crate::store::{GenerationArchive, JobStore, StoreError};
use crate::synth::{synthesize_normalized, Synthesizer};

/// Maximum length of the prompt-derived portion of an artifact name.
const MAX_SLUG_CHARS: usize = 40;

/// Processing failure for one delivery attempt.
///
/// `Retriable` asks the queue to redeliver; `Dropped` acks the unit even
/// though nothing was produced (e.g. the job row no longer exists).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProcessError {
    #[error("{0}")]
    Retriable(String),
    #[error("{0}")]
    Dropped(String),
}

pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    archive: Arc<dyn GenerationArchive>,
    synthesizer: Arc<dyn Synthesizer>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn JobStore>,
        archive: Arc<dyn GenerationArchive>,
        synthesizer: Arc<dyn Synthesizer>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            store,
            archive,
            synthesizer,
            artifacts,
        }
    }

    /// Process one delivered work unit to a terminal state.
    pub async fn process(&self, unit: &WorkUnit) -> Result<(), ProcessError> {
        let job = self
            .store
            .get(unit.job_id)
            .await
            .map_err(retriable)?;

        let Some(job) = job else {
            // The unit references a row that no longer exists; retrying
            // cannot help, so drop it.
            warn!(job_id = %unit.job_id, "work unit references unknown job, dropping");
            return Err(ProcessError::Dropped("unknown job".to_string()));
        };

        if job.status == JobStatus::Completed {
            debug!(job_id = %unit.job_id, "duplicate delivery for completed job, acking");
            // Restore an archive record lost to a failed append after the
            // job completed; the archive keeps at most one record per job,
            // so this cannot duplicate history.
            if let Some(result_url) = &job.result_url {
                self.archive
                    .append(Generation::new(
                        job.id,
                        result_url.clone(),
                        job.prompt.clone(),
                        job.model,
                    ))
                    .await
                    .map_err(retriable)?;
            }
            return Ok(());
        }

        self.store
            .update_status(unit.job_id, StatusUpdate::Processing)
            .await
            .map_err(retriable)?;

        match self.synthesize_and_store(unit).await {
            Ok(result_url) => {
                let row = self
                    .store
                    .update_status(
                        unit.job_id,
                        StatusUpdate::Completed {
                            result_url: result_url.clone(),
                        },
                    )
                    .await
                    .map_err(retriable)?;

                // A failure here is retriable: the redelivery hits the
                // completed-guard above, which re-appends from the row.
                self.archive
                    .append(Generation::new(
                        unit.job_id,
                        result_url,
                        unit.prompt.clone(),
                        unit.model,
                    ))
                    .await
                    .map_err(retriable)?;

                info!(job_id = %unit.job_id, result_url = ?row.result_url, "job completed");
                Ok(())
            }
            Err(message) => {
                warn!(job_id = %unit.job_id, error = %message, "job processing failed");
                self.store
                    .update_status(
                        unit.job_id,
                        StatusUpdate::Failed {
                            error: message.clone(),
                        },
                    )
                    .await
                    .map_err(retriable)?;
                Err(ProcessError::Retriable(message))
            }
        }
    }

    /// Steps 2–4 of the algorithm; any failure here is caught locally and
    /// becomes the job's persisted error message.
    async fn synthesize_and_store(&self, unit: &WorkUnit) -> Result<String, String> {
        let synthesis = synthesize_normalized(self.synthesizer.as_ref(), &unit.prompt, unit.model)
            .await
            .map_err(|e| e.to_string())?;

        let name = derived_artifact_name(&unit.prompt, Utc::now());
        let metadata = ArtifactMetadata {
            prompt: unit.prompt.clone(),
            model: unit.model,
            generation_ms: synthesis.elapsed.as_millis() as u64,
        };

        self.artifacts
            .store(&synthesis.bytes, &name, &metadata)
            .await
            .map_err(|e| e.to_string())
    }
}

fn retriable(e: StoreError) -> ProcessError {
    ProcessError::Retriable(e.to_string())
}

/// Derive a collision-resistant, filesystem-safe artifact name:
/// timestamp prefix plus the prompt lower-cased with runs of
/// non-alphanumerics collapsed to single separators, truncated.
pub fn derived_artifact_name(prompt: &str, at: chrono::DateTime<Utc>) -> String {
    let mut slug = String::with_capacity(MAX_SLUG_CHARS);
    let mut last_was_separator = true;

    for c in prompt.chars() {
        if slug.chars().count() >= MAX_SLUG_CHARS {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_separator = false;
        } else if !last_was_separator {
            slug.push('-');
            last_was_separator = true;
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "image" } else { slug };

    format!("{}-{}.png", at.format("%Y%m%d%H%M%S"), slug)
}
