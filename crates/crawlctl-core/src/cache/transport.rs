//! Work-queue transport (§6): a partitioned, offset-acknowledged pub/sub
//! stream. Modeled on Redis Streams — one stream per partition, a shared
//! consumer group, and manual XACK after successful insertion into the
//! admission engine's pending set, matching the "offsets are committed
//! manually" contract.

use crate::cache::{CacheError, CacheResult, RedisPool, TransportConfig};
use redis::{Cmd, Value};
use serde::{Deserialize, Serialize};

/// Wire payload: `{"jobId":"…","urls":[…],"userId":"…"|null}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportMessage {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub urls: Vec<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// A message delivered from the transport, paired with its stream-local
/// delivery handle so the caller can acknowledge it once consumed.
///
/// `message` is `None` when the entry's payload was missing or failed to
/// parse as a [`TransportMessage`] — the delivery still carries its
/// `stream`/`entry_id` so the caller can ack and log it instead of the
/// entry silently vanishing and being redelivered forever.
pub struct Delivery {
    pub message: Option<TransportMessage>,
    pub stream: String,
    pub entry_id: String,
}

pub struct StreamTransport {
    pool: RedisPool,
    config: TransportConfig,
}

impl StreamTransport {
    pub fn new(pool: RedisPool, config: TransportConfig) -> Self {
        Self { pool, config }
    }

    fn partition_stream(&self, job_id: &str) -> String {
        let partition = partition_for(job_id, self.config.partitions);
        format!("{}:{}", self.config.topic, partition)
    }

    /// Publish a task record, using `jobId` as the partition key so any
    /// per-job ordering within a partition is preserved.
    pub async fn publish(&self, message: &TransportMessage) -> CacheResult<()> {
        let stream = self.partition_stream(&message.job_id);
        let payload = serde_json::to_string(message)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let mut conn = self.pool.get().await?;
        conn.xgroup_create(&stream, &self.config.consumer_group).await?;
        conn.xadd(&stream, &[("payload", payload.as_str())]).await?;
        Ok(())
    }

    /// Ensure the consumer group exists on every partition. Call once at
    /// startup before the intake loop begins reading.
    pub async fn ensure_groups(&self) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        for partition in 0..self.config.partitions {
            let stream = format!("{}:{}", self.config.topic, partition);
            conn.xgroup_create(&stream, &self.config.consumer_group).await?;
        }
        Ok(())
    }

    /// Read the next batch of undelivered entries across all partitions for
    /// the given consumer name. Blocks up to `poll_block_ms`.
    pub async fn poll(&self, consumer: &str) -> CacheResult<Vec<Delivery>> {
        let mut conn = self.pool.get().await?;
        let mut deliveries = Vec::new();

        for partition in 0..self.config.partitions {
            let stream = format!("{}:{}", self.config.topic, partition);

            let mut cmd = Cmd::new();
            cmd.arg("XREADGROUP")
                .arg("GROUP")
                .arg(&self.config.consumer_group)
                .arg(consumer)
                .arg("COUNT")
                .arg(10)
                .arg("BLOCK")
                .arg(self.config.poll_block_ms)
                .arg("STREAMS")
                .arg(&stream)
                .arg(">");

            let raw = conn.execute(cmd).await?;
            deliveries.extend(parse_xreadgroup(&stream, raw)?);
        }

        Ok(deliveries)
    }

    /// Acknowledge a delivered entry. Only called after the message has been
    /// successfully inserted into the admission engine's pending set —
    /// failures before that point intentionally leave the entry unacked so
    /// it is redelivered (§4.1 intake semantics).
    pub async fn ack(&self, delivery: &Delivery) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        conn.xack(&delivery.stream, &self.config.consumer_group, &delivery.entry_id)
            .await
    }
}

fn partition_for(job_id: &str, partitions: u32) -> u32 {
    let hash = job_id.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    (hash % partitions.max(1) as u64) as u32
}

/// Parse the nested RESP reply of XREADGROUP into flat deliveries. An entry
/// whose payload is missing or fails to parse as a [`TransportMessage`]
/// still produces a `Delivery` (with `message: None`) rather than being
/// dropped here — the intake loop owns ack decisions, so malformed-vs-valid
/// handling stays in one place and a poison-pill entry still gets acked
/// instead of redelivering forever.
fn parse_xreadgroup(stream: &str, raw: Value) -> CacheResult<Vec<Delivery>> {
    let mut out = Vec::new();

    let streams = match raw {
        Value::Array(v) => v,
        Value::Nil => return Ok(out),
        _ => return Ok(out),
    };

    for entry in streams {
        let Value::Array(pair) = entry else { continue };
        let [_name, entries] = pair.as_slice() else { continue };
        let Value::Array(entries) = entries else { continue };

        for item in entries {
            let Value::Array(fields) = item else { continue };
            let [id_value, kv] = fields.as_slice() else { continue };

            let entry_id: String = match redis::from_redis_value(id_value) {
                Ok(v) => v,
                Err(_) => continue,
            };

            let Value::Array(kv) = kv else {
                out.push(Delivery { message: None, stream: stream.to_string(), entry_id });
                continue;
            };

            let mut payload: Option<String> = None;
            let mut idx = 0;
            while idx + 1 < kv.len() {
                let field: String = redis::from_redis_value(&kv[idx]).unwrap_or_default();
                if field == "payload" {
                    payload = redis::from_redis_value(&kv[idx + 1]).ok();
                }
                idx += 2;
            }

            let message = payload.as_deref().and_then(|p| serde_json::from_str::<TransportMessage>(p).ok());
            out.push(Delivery { message, stream: stream.to_string(), entry_id });
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_stable_for_same_job_id() {
        let a = partition_for("job-123", 3);
        let b = partition_for("job-123", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_partition_within_bounds() {
        for i in 0..50 {
            let job_id = format!("job-{i}");
            assert!(partition_for(&job_id, 3) < 3);
        }
    }

    #[test]
    fn test_message_serialization_shape() {
        let message = TransportMessage {
            job_id: "abc".to_string(),
            urls: vec!["https://a".to_string()],
            user_id: None,
        };
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"jobId\":\"abc\""));
        assert!(json.contains("\"userId\":null"));
    }
}
