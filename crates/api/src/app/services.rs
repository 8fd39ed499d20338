use std::sync::Arc;

use pixelforge_infra::{
    FsArtifactStore, HttpSynthesizer, InMemoryGenerationArchive, InMemoryJobStore,
    InMemoryWorkQueue, JobProcessor, JobService, ProcessingWorker, SynthesisError, WaitConfig,
    WaitCoordinator, WorkerHandle,
};

use crate::config::ApiConfig;

/// Service graph shared by every request handler.
pub struct AppServices {
    pub jobs: JobService,
    pub wait: WaitCoordinator,
}

/// Wire up the store, queue, processor, and background worker.
///
/// The returned [`WorkerHandle`] owns the processing loop; dropping it does
/// not stop the worker, but `main` keeps it around for a graceful shutdown.
pub async fn build_services(
    config: &ApiConfig,
) -> Result<(Arc<AppServices>, WorkerHandle), SynthesisError> {
    let store = InMemoryJobStore::arc();
    let archive = InMemoryGenerationArchive::arc();
    let (queue, consumer) = InMemoryWorkQueue::new(config.queue_max_attempts);

    let synthesizer = Arc::new(HttpSynthesizer::new(config.synth_url.clone())?);
    let artifacts = Arc::new(FsArtifactStore::new(
        config.artifact_dir.clone(),
        config.artifact_base_url.clone(),
    ));

    let processor = Arc::new(JobProcessor::new(
        store.clone(),
        archive.clone(),
        synthesizer,
        artifacts,
    ));
    let worker = ProcessingWorker::new(consumer, processor).spawn();

    let services = AppServices {
        jobs: JobService::new(store.clone(), archive, queue),
        wait: WaitCoordinator::new(store, WaitConfig::default()),
    };

    Ok((Arc::new(services), worker))
}
