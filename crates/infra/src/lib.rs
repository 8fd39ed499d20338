//! `pixelforge-infra` — collaborators and background machinery.
//!
//! Everything here sits behind a trait seam so the API layer (and tests)
//! can swap implementations: job store, generation archive, work queue,
//! synthesis client, artifact store. On top of those sit the job processor,
//! the background worker that drains the queue, the job service used by the
//! HTTP handlers, and the wait coordinator.

pub mod artifact;
pub mod processor;
pub mod queue;
pub mod service;
pub mod store;
pub mod synth;
pub mod wait;
pub mod worker;

pub use artifact::{ArtifactMetadata, ArtifactStore, ArtifactStoreError, FsArtifactStore};
pub use processor::{JobProcessor, ProcessError};
pub use queue::{
    DeadLetter, InMemoryWorkConsumer, InMemoryWorkQueue, QueueError, WorkConsumer, WorkDelivery,
    WorkDispatcher,
};
pub use service::{CreateRequest, JobService};
pub use store::{
    GenerationArchive, InMemoryGenerationArchive, InMemoryJobStore, JobStore, StoreError,
};
pub use synth::{HttpSynthesizer, RawSynthesis, Synthesis, Synthesizer, SynthesisError};
pub use wait::{WaitCoordinator, WaitConfig, WaitError, WaitResult};
pub use worker::{ProcessingWorker, WorkerHandle};
