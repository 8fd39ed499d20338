//! Background worker that drains the dispatch channel.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::processor::{JobProcessor, ProcessError};
use crate::queue::WorkConsumer;

/// How many units one drain pass may pick up.
const BATCH_SIZE: usize = 8;

/// The background consumer: receives batches of work deliveries, runs the
/// processor on each, and drives ack/retry from the outcome.
pub struct ProcessingWorker<C: WorkConsumer + 'static> {
    consumer: C,
    processor: Arc<JobProcessor>,
}

impl<C: WorkConsumer + 'static> ProcessingWorker<C> {
    pub fn new(consumer: C, processor: Arc<JobProcessor>) -> Self {
        Self {
            consumer,
            processor,
        }
    }

    /// Spawn the worker onto the runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        WorkerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("processing worker started");

        loop {
            let batch = tokio::select! {
                batch = self.consumer.next_batch(BATCH_SIZE) => batch,
                _ = shutdown.changed() => break,
            };

            let Some(batch) = batch else {
                // Channel closed and drained.
                break;
            };

            debug!(units = batch.len(), "processing batch");
            for delivery in batch {
                match self.processor.process(&delivery.unit).await {
                    Ok(()) => delivery.ack().await,
                    Err(ProcessError::Dropped(_)) => delivery.ack().await,
                    Err(ProcessError::Retriable(reason)) => delivery.retry(reason).await,
                }
            }
        }

        info!("processing worker stopped");
    }
}

/// Handle to a running worker.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}
