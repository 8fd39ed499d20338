//! The dispatch channel: at-least-once delivery of work units.
//!
//! One work unit is sent per created job. The consuming side receives
//! batches of deliveries carrying `ack()`/`retry()` controls; a retried
//! unit is re-queued until the configured attempt limit, after which it is
//! routed to the dead-letter list. No ordering is guaranteed and duplicate
//! deliveries of the same unit are possible; the processor tolerates both.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pixelforge_core::WorkUnit;

mod in_memory;
#[cfg(feature = "redis")]
mod redis_streams;

pub use in_memory::{InMemoryWorkConsumer, InMemoryWorkQueue};
#[cfg(feature = "redis")]
pub use redis_streams::{RedisWorkConsumer, RedisWorkQueue};

/// Queue transport error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("enqueue failed: {0}")]
    Send(String),
    #[error("queue closed")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// Producing side of the dispatch channel.
#[async_trait]
pub trait WorkDispatcher: Send + Sync {
    /// Enqueue one work unit.
    async fn send(&self, unit: WorkUnit) -> Result<(), QueueError>;
}

/// Consuming side of the dispatch channel.
#[async_trait]
pub trait WorkConsumer: Send {
    /// Receive the next batch of deliveries, up to `max` units.
    ///
    /// Waits until at least one unit is available; returns `None` once the
    /// channel is closed and drained.
    async fn next_batch(&mut self, max: usize) -> Option<Vec<WorkDelivery>>;
}

/// One delivered work unit plus its redelivery controls.
pub struct WorkDelivery {
    pub unit: WorkUnit,
    /// 1-based delivery attempt.
    pub attempt: u32,
    controls: Box<dyn DeliveryControls>,
}

impl WorkDelivery {
    pub(crate) fn new(unit: WorkUnit, attempt: u32, controls: Box<dyn DeliveryControls>) -> Self {
        Self {
            unit,
            attempt,
            controls,
        }
    }

    /// Mark the delivery processed; it will not be redelivered.
    pub async fn ack(self) {
        self.controls.ack().await;
    }

    /// Request redelivery. After the queue's attempt limit the unit is
    /// dead-lettered with `reason` instead.
    pub async fn retry(self, reason: impl Into<String>) {
        self.controls.retry(reason.into()).await;
    }
}

impl std::fmt::Debug for WorkDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkDelivery")
            .field("unit", &self.unit)
            .field("attempt", &self.attempt)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub(crate) trait DeliveryControls: Send {
    async fn ack(self: Box<Self>);
    async fn retry(self: Box<Self>, reason: String);
}

/// A work unit that exhausted its delivery attempts.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub unit: WorkUnit,
    pub attempts: u32,
    pub reason: String,
    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(unit: WorkUnit, attempts: u32, reason: String) -> Self {
        Self {
            unit,
            attempts,
            reason,
            dead_lettered_at: Utc::now(),
        }
    }
}
