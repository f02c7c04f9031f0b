//! Live Status Cache (§4.4): a keyed write-through channel from worker-side
//! progress reporters to the status read path. Every write carries the full
//! progress snapshot and refreshes the TTL; terminal transitions delete the
//! key outright so the status endpoint falls back to the durable store.

use crate::cache::{CacheNamespace, CacheResult, LiveStatusConfig, RedisPool};
use crate::jobs::job::JobStatus;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveStatus {
    pub status: JobStatus,
    pub message: String,
    pub urls_submitted: i32,
    pub urls_succeeded: i32,
    pub urls_failed: i32,
}

/// Handle onto the Redis-backed live status channel
pub struct LiveStatusCache {
    pool: RedisPool,
    config: LiveStatusConfig,
}

impl LiveStatusCache {
    pub fn new(pool: RedisPool, config: LiveStatusConfig) -> Self {
        Self { pool, config }
    }

    fn key(job_id: &str) -> String {
        CacheNamespace::LiveStatus.key(job_id)
    }

    /// Write (or refresh) the live status snapshot for a job
    pub async fn set(&self, job_id: &str, status: &LiveStatus) -> CacheResult<()> {
        let payload = serde_json::to_vec(status)
            .map_err(|e| crate::cache::CacheError::SerializationError(e.to_string()))?;

        let mut conn = self.pool.get().await?;
        conn.setex(&Self::key(job_id), self.config.ttl_secs, &payload)
            .await
    }

    /// Read the live status snapshot, if present and parseable. A malformed
    /// payload is logged and treated as absent so callers fall back to DJS.
    pub async fn get(&self, job_id: &str) -> CacheResult<Option<LiveStatus>> {
        let mut conn = self.pool.get().await?;
        let raw = conn.get(&Self::key(job_id)).await?;

        let Some(bytes) = raw else {
            return Ok(None);
        };

        match serde_json::from_slice::<LiveStatus>(&bytes) {
            Ok(status) => Ok(Some(status)),
            Err(e) => {
                warn!(job_id, error = %e, "malformed live status payload, falling back to durable store");
                Ok(None)
            }
        }
    }

    /// Delete the live status entry for a job. Called on every terminal
    /// transition (§3 invariant: terminal writes delete the LSC entry).
    pub async fn delete(&self, job_id: &str) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        conn.del(&Self::key(job_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(
            LiveStatusCache::key("abc-123"),
            "scraping:job:live:status:abc-123"
        );
    }

    #[test]
    fn test_live_status_roundtrip_serialization() {
        let status = LiveStatus {
            status: JobStatus::Running,
            message: "Crawling 1/2".to_string(),
            urls_submitted: 2,
            urls_succeeded: 1,
            urls_failed: 0,
        };

        let json = serde_json::to_string(&status).unwrap();
        let parsed: LiveStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
