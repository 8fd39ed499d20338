//! Redis Streams-backed work queue (durable, at-least-once delivery).
//!
//! Uses XADD / XREADGROUP / XACK so that units persist until acknowledged
//! and unacknowledged units are redelivered. Retry re-enqueues the unit
//! with an incremented attempt counter; once the attempt limit is reached
//! the unit goes to a dead-letter stream instead.
//!
//! - Stream key: `pixelforge:work`
//! - Consumer group: one per worker deployment
//! - Dead-letter stream: `pixelforge:work:dlq`

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use pixelforge_core::WorkUnit;

use super::{DeliveryControls, QueueError, WorkConsumer, WorkDelivery, WorkDispatcher};

const DEFAULT_STREAM_KEY: &str = "pixelforge:work";
const DEFAULT_DLQ_KEY: &str = "pixelforge:work:dlq";
const BLOCK_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct RedisWorkQueue {
    client: Arc<redis::Client>,
    stream_key: String,
    dlq_key: String,
    max_attempts: u32,
}

impl RedisWorkQueue {
    pub fn new(
        redis_url: impl AsRef<str>,
        max_attempts: u32,
        stream_key: Option<String>,
        dlq_key: Option<String>,
    ) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            stream_key: stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
            dlq_key: dlq_key.unwrap_or_else(|| DEFAULT_DLQ_KEY.to_string()),
            max_attempts,
        })
    }

    /// Create the consumer group if it does not exist yet (idempotent).
    pub fn ensure_consumer_group(&self, group: &str) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        // MKSTREAM creates the stream on first use; an existing-group error
        // is expected on restart and ignored.
        let _: Result<String, _> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query(&mut conn);

        Ok(())
    }

    fn send_sync(&self, unit: &WorkUnit, attempt: u32) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(unit).map_err(|e| QueueError::Send(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("job_id")
            .arg(unit.job_id.to_string())
            .arg("attempt")
            .arg(attempt.to_string())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| QueueError::Send(format!("XADD failed: {e}")))?;

        Ok(())
    }

    fn ack_sync(&self, group: &str, message_id: &str) -> Result<(), QueueError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        let _: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(group)
            .arg(message_id)
            .query(&mut conn)
            .map_err(|e| QueueError::Transport(format!("XACK failed: {e}")))?;

        Ok(())
    }

    fn dead_letter_sync(
        &self,
        unit: &WorkUnit,
        attempts: u32,
        reason: &str,
    ) -> Result<(), QueueError> {
        let payload =
            serde_json::to_string(unit).map_err(|e| QueueError::Send(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        let _: String = redis::cmd("XADD")
            .arg(&self.dlq_key)
            .arg("*")
            .arg("job_id")
            .arg(unit.job_id.to_string())
            .arg("attempts")
            .arg(attempts.to_string())
            .arg("reason")
            .arg(reason)
            .arg("failed_at")
            .arg(chrono::Utc::now().to_rfc3339())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| QueueError::Transport(format!("DLQ XADD failed: {e}")))?;

        warn!(job_id = %unit.job_id, attempts, reason, "work unit dead-lettered");
        Ok(())
    }

    fn read_batch_sync(
        &self,
        group: &str,
        consumer: &str,
        max: usize,
    ) -> Result<Vec<(String, WorkUnit, u32)>, QueueError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| QueueError::Transport(e.to_string()))?;

        let reply: redis::Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(group)
            .arg(consumer)
            .arg("COUNT")
            .arg(max.to_string())
            .arg("BLOCK")
            .arg(BLOCK_MS.to_string())
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query(&mut conn)
            .map_err(|e| QueueError::Transport(format!("XREADGROUP failed: {e}")))?;

        Ok(parse_stream_reply(reply))
    }
}

/// Walk an XREADGROUP reply into (message_id, unit, attempt) triples.
///
/// Reply shape: `[[stream_key, [[id, [field, value, ...]], ...]]]`; a Nil
/// reply means the blocking read timed out with nothing new.
fn parse_stream_reply(reply: redis::Value) -> Vec<(String, WorkUnit, u32)> {
    let mut out = Vec::new();

    let redis::Value::Bulk(streams) = reply else {
        return out;
    };

    for stream in streams {
        let redis::Value::Bulk(stream_parts) = stream else {
            continue;
        };
        let Some(redis::Value::Bulk(entries)) = stream_parts.get(1) else {
            continue;
        };

        for entry in entries {
            let redis::Value::Bulk(entry_parts) = entry else {
                continue;
            };
            let Some(redis::Value::Data(id_bytes)) = entry_parts.first() else {
                continue;
            };
            let message_id = String::from_utf8_lossy(id_bytes).to_string();

            let Some(redis::Value::Bulk(fields)) = entry_parts.get(1) else {
                continue;
            };

            let mut payload: Option<String> = None;
            let mut attempt: u32 = 1;
            for pair in fields.chunks(2) {
                if let [redis::Value::Data(key), redis::Value::Data(value)] = pair {
                    match String::from_utf8_lossy(key).as_ref() {
                        "payload" => payload = Some(String::from_utf8_lossy(value).to_string()),
                        "attempt" => {
                            attempt = String::from_utf8_lossy(value).parse().unwrap_or(1)
                        }
                        _ => {}
                    }
                }
            }

            match payload.as_deref().map(serde_json::from_str::<WorkUnit>) {
                Some(Ok(unit)) => out.push((message_id, unit, attempt)),
                _ => warn!(message_id = %message_id, "skipping undecodable stream entry"),
            }
        }
    }

    out
}

/// Consumer-group reader over a [`RedisWorkQueue`].
pub struct RedisWorkConsumer {
    queue: Arc<RedisWorkQueue>,
    group: String,
    consumer: String,
}

impl RedisWorkConsumer {
    pub fn new(queue: Arc<RedisWorkQueue>, group: &str, consumer: &str) -> Result<Self, QueueError> {
        queue.ensure_consumer_group(group)?;
        Ok(Self {
            queue,
            group: group.to_string(),
            consumer: consumer.to_string(),
        })
    }
}

#[async_trait]
impl WorkDispatcher for RedisWorkQueue {
    async fn send(&self, unit: WorkUnit) -> Result<(), QueueError> {
        let queue = self.clone();
        tokio::task::spawn_blocking(move || queue.send_sync(&unit, 1))
            .await
            .map_err(|e| QueueError::Transport(e.to_string()))?
    }
}

#[async_trait]
impl WorkConsumer for RedisWorkConsumer {
    async fn next_batch(&mut self, max: usize) -> Option<Vec<WorkDelivery>> {
        loop {
            let queue = self.queue.clone();
            let group = self.group.clone();
            let consumer = self.consumer.clone();

            let read = tokio::task::spawn_blocking(move || {
                queue.read_batch_sync(&group, &consumer, max)
            })
            .await;

            let entries = match read {
                Ok(Ok(entries)) => entries,
                Ok(Err(e)) => {
                    error!(error = %e, "failed to read work stream");
                    tokio::time::sleep(std::time::Duration::from_millis(BLOCK_MS)).await;
                    continue;
                }
                Err(_) => return None,
            };

            if entries.is_empty() {
                continue;
            }

            let batch = entries
                .into_iter()
                .map(|(message_id, unit, attempt)| {
                    let controls = RedisControls {
                        queue: self.queue.clone(),
                        group: self.group.clone(),
                        message_id,
                        unit: unit.clone(),
                        attempt,
                    };
                    WorkDelivery::new(unit, attempt, Box::new(controls))
                })
                .collect();
            return Some(batch);
        }
    }
}

struct RedisControls {
    queue: Arc<RedisWorkQueue>,
    group: String,
    message_id: String,
    unit: WorkUnit,
    attempt: u32,
}

#[async_trait]
impl DeliveryControls for RedisControls {
    async fn ack(self: Box<Self>) {
        let this = *self;
        let _ = tokio::task::spawn_blocking(move || {
            if let Err(e) = this.queue.ack_sync(&this.group, &this.message_id) {
                error!(error = %e, message_id = %this.message_id, "failed to ack work unit");
            }
        })
        .await;
    }

    async fn retry(self: Box<Self>, reason: String) {
        let this = *self;
        let _ = tokio::task::spawn_blocking(move || {
            // Ack the delivered entry either way; the retry is a fresh entry.
            if let Err(e) = this.queue.ack_sync(&this.group, &this.message_id) {
                error!(error = %e, message_id = %this.message_id, "failed to ack before retry");
            }

            let result = if this.attempt >= this.queue.max_attempts {
                this.queue.dead_letter_sync(&this.unit, this.attempt, &reason)
            } else {
                this.queue.send_sync(&this.unit, this.attempt + 1)
            };
            if let Err(e) = result {
                error!(error = %e, job_id = %this.unit.job_id, "failed to requeue work unit");
            }
        })
        .await;
    }
}
