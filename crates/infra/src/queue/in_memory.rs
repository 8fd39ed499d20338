//! In-memory work queue for single-process deployments and tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use pixelforge_core::WorkUnit;

use super::{DeadLetter, DeliveryControls, QueueError, WorkConsumer, WorkDelivery, WorkDispatcher};

/// Default attempt limit before a unit is dead-lettered.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct Envelope {
    unit: WorkUnit,
    attempt: u32,
}

/// Unbounded in-process queue with redelivery and a dead-letter list.
#[derive(Debug)]
pub struct InMemoryWorkQueue {
    tx: mpsc::UnboundedSender<Envelope>,
    max_attempts: u32,
    dead_letters: Mutex<Vec<DeadLetter>>,
}

impl InMemoryWorkQueue {
    /// Create the queue and its single consumer.
    pub fn new(max_attempts: u32) -> (Arc<Self>, InMemoryWorkConsumer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(Self {
            tx,
            max_attempts,
            dead_letters: Mutex::new(Vec::new()),
        });
        let consumer = InMemoryWorkConsumer {
            rx,
            queue: queue.clone(),
        };
        (queue, consumer)
    }

    /// Snapshot of dead-lettered units.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().unwrap().clone()
    }

    fn requeue(&self, envelope: Envelope, reason: String) {
        if envelope.attempt >= self.max_attempts {
            warn!(
                job_id = %envelope.unit.job_id,
                attempts = envelope.attempt,
                reason = %reason,
                "work unit dead-lettered"
            );
            self.dead_letters.lock().unwrap().push(DeadLetter::new(
                envelope.unit,
                envelope.attempt,
                reason,
            ));
            return;
        }

        let next = Envelope {
            unit: envelope.unit,
            attempt: envelope.attempt + 1,
        };
        // Send only fails when the consumer is gone; nothing left to retry into.
        let _ = self.tx.send(next);
    }
}

#[async_trait]
impl WorkDispatcher for InMemoryWorkQueue {
    async fn send(&self, unit: WorkUnit) -> Result<(), QueueError> {
        self.tx
            .send(Envelope { unit, attempt: 1 })
            .map_err(|_| QueueError::Closed)
    }
}

/// Single consumer of an [`InMemoryWorkQueue`].
pub struct InMemoryWorkConsumer {
    rx: mpsc::UnboundedReceiver<Envelope>,
    queue: Arc<InMemoryWorkQueue>,
}

#[async_trait]
impl WorkConsumer for InMemoryWorkConsumer {
    async fn next_batch(&mut self, max: usize) -> Option<Vec<WorkDelivery>> {
        let first = self.rx.recv().await?;

        let mut batch = vec![self.delivery(first)];
        while batch.len() < max {
            match self.rx.try_recv() {
                Ok(envelope) => batch.push(self.delivery(envelope)),
                Err(_) => break,
            }
        }
        Some(batch)
    }
}

impl InMemoryWorkConsumer {
    fn delivery(&self, envelope: Envelope) -> WorkDelivery {
        let controls = InMemoryControls {
            queue: self.queue.clone(),
            envelope: envelope.clone(),
        };
        WorkDelivery::new(envelope.unit, envelope.attempt, Box::new(controls))
    }
}

struct InMemoryControls {
    queue: Arc<InMemoryWorkQueue>,
    envelope: Envelope,
}

#[async_trait]
impl DeliveryControls for InMemoryControls {
    async fn ack(self: Box<Self>) {}

    async fn retry(self: Box<Self>, reason: String) {
        self.queue.requeue(self.envelope, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelforge_core::{ImageModel, JobId};

    fn unit() -> WorkUnit {
        WorkUnit {
            job_id: JobId::new(),
            prompt: "a red apple".into(),
            model: ImageModel::Fast,
        }
    }

    #[tokio::test]
    async fn send_then_receive_batch() {
        let (queue, mut consumer) = InMemoryWorkQueue::new(3);
        let u1 = unit();
        let u2 = unit();
        queue.send(u1.clone()).await.unwrap();
        queue.send(u2.clone()).await.unwrap();

        let batch = consumer.next_batch(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].unit, u1);
        assert_eq!(batch[0].attempt, 1);
        assert_eq!(batch[1].unit, u2);
    }

    #[tokio::test]
    async fn batch_size_is_bounded() {
        let (queue, mut consumer) = InMemoryWorkQueue::new(3);
        for _ in 0..5 {
            queue.send(unit()).await.unwrap();
        }

        let batch = consumer.next_batch(2).await.unwrap();
        assert_eq!(batch.len(), 2);
        let batch = consumer.next_batch(10).await.unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn retry_redelivers_with_incremented_attempt() {
        let (queue, mut consumer) = InMemoryWorkQueue::new(3);
        queue.send(unit()).await.unwrap();

        let mut batch = consumer.next_batch(1).await.unwrap();
        let delivery = batch.pop().unwrap();
        assert_eq!(delivery.attempt, 1);
        delivery.retry("synthesis failed").await;

        let mut batch = consumer.next_batch(1).await.unwrap();
        let delivery = batch.pop().unwrap();
        assert_eq!(delivery.attempt, 2);
        delivery.ack().await;
        assert!(queue.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn exhausted_retries_dead_letter() {
        let (queue, mut consumer) = InMemoryWorkQueue::new(2);
        let u = unit();
        queue.send(u.clone()).await.unwrap();

        for expected_attempt in 1..=2 {
            let mut batch = consumer.next_batch(1).await.unwrap();
            let delivery = batch.pop().unwrap();
            assert_eq!(delivery.attempt, expected_attempt);
            delivery.retry("still failing").await;
        }

        let dead = queue.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].unit, u);
        assert_eq!(dead[0].attempts, 2);
        assert_eq!(dead[0].reason, "still failing");
    }
}
