//! Resource Ledger (§4.3): cluster-wide running-job accounting plus
//! per-user sliding-window thread and job quotas. Everything here lives in
//! the same Redis instance as the Live Status Cache, in the `crawler:*`
//! keyspace, and is mutated through native INCR/DECR/SADD primitives so
//! concurrent callers never corrupt a counter — the ledger is only
//! consistent to within one dispatch tick.

use crate::cache::{CacheResult, RedisPool, ResourceLedgerConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

const RUNNING_JOBS_KEY: &str = "crawler:worker:running:jobs";
const THREAD_USAGE_KEY: &str = "crawler:worker:thread:usage";

fn user_threads_key(user_id: &str) -> String {
    format!("crawler:user:threads:{user_id}")
}

fn user_jobs_key(user_id: &str) -> String {
    format!("crawler:user:jobs:{user_id}")
}

/// Cluster-wide snapshot used by the priority engine's execution gate
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerResourceStatus {
    pub total_instances: i32,
    pub total_threads: i32,
    pub used_threads: i32,
    pub used_instances: i32,
    pub utilization: f64,
}

impl WorkerResourceStatus {
    pub fn available_threads(&self) -> i32 {
        (self.total_threads - self.used_threads).max(0)
    }

    pub fn available_instances(&self) -> i32 {
        (self.total_instances - self.used_instances).max(0)
    }
}

/// Per-user usage within the current sliding window
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserUsage {
    pub threads_in_use: i64,
    pub jobs_started_in_window: i64,
}

/// Immutable worker capacity configuration (§3 `WorkerCapacity`)
#[derive(Debug, Clone, Copy)]
pub struct WorkerCapacity {
    pub total_instances: i32,
    pub max_threads_per_instance: i32,
}

impl WorkerCapacity {
    pub fn total_threads(&self) -> i32 {
        self.total_instances * self.max_threads_per_instance
    }
}

pub struct ResourceLedger {
    pool: RedisPool,
    config: ResourceLedgerConfig,
}

impl ResourceLedger {
    pub fn new(pool: RedisPool, config: ResourceLedgerConfig) -> Self {
        Self { pool, config }
    }

    /// Step 2 of the dispatch loop (§4.1): register a start against the
    /// cluster running-set, the cluster thread counter, the per-user thread
    /// budget, and the per-user job counter.
    pub async fn register_start(
        &self,
        job_id: &str,
        user_id: Option<&str>,
        estimated_threads: i32,
    ) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;
        let ttl = self.config.cluster_ttl_secs;

        conn.sadd(RUNNING_JOBS_KEY, job_id).await?;
        conn.expire(RUNNING_JOBS_KEY, ttl).await?;

        conn.incr_by(THREAD_USAGE_KEY, estimated_threads as i64).await?;
        conn.expire(THREAD_USAGE_KEY, ttl).await?;

        if let Some(user_id) = user_id {
            let threads_key = user_threads_key(user_id);
            conn.incr_by(&threads_key, estimated_threads as i64).await?;
            conn.expire(&threads_key, self.config.time_window_seconds)
                .await?;

            let jobs_key = user_jobs_key(user_id);
            // Only ever incremented: this counter resets purely via TTL
            // expiry (§9 open question: an approximation of a true window).
            let new_value = conn.incr_by(&jobs_key, 1).await?;
            if new_value == 1 {
                conn.expire(&jobs_key, self.config.time_window_seconds)
                    .await?;
            }
        }

        Ok(())
    }

    /// Step 4 of the dispatch loop: release credits on completion,
    /// regardless of success or failure.
    pub async fn release(
        &self,
        job_id: &str,
        user_id: Option<&str>,
        estimated_threads: i32,
    ) -> CacheResult<()> {
        let mut conn = self.pool.get().await?;

        conn.srem(RUNNING_JOBS_KEY, job_id).await?;

        let remaining = conn.decr_clamped(THREAD_USAGE_KEY, estimated_threads as i64).await?;
        if remaining == 0 {
            warn!(job_id, "cluster thread usage clamped at zero on release");
        }

        if let Some(user_id) = user_id {
            let threads_key = user_threads_key(user_id);
            let user_remaining = conn.decr_clamped(&threads_key, estimated_threads as i64).await?;
            if user_remaining == 0 {
                warn!(job_id, user_id, "user thread usage clamped at zero on release");
            }
        }

        Ok(())
    }

    /// Read path: `getCurrentResourceStatus()` (§4.3)
    pub async fn get_current_resource_status(
        &self,
        capacity: WorkerCapacity,
    ) -> CacheResult<WorkerResourceStatus> {
        let mut conn = self.pool.get().await?;

        let running = conn.scard(RUNNING_JOBS_KEY).await?;
        let mut used_threads = conn.get_int(THREAD_USAGE_KEY).await?;

        if used_threads == 0 && running > 0 {
            // Fallback estimate per §4.3: authoritative counter missing but
            // the running-set is non-empty.
            used_threads = 2 * running;
        }

        let total_threads = capacity.total_threads() as i64;
        let utilization = if total_threads > 0 {
            used_threads as f64 / total_threads as f64
        } else {
            0.0
        };

        Ok(WorkerResourceStatus {
            total_instances: capacity.total_instances,
            total_threads: total_threads as i32,
            used_threads: used_threads as i32,
            used_instances: running.min(capacity.total_instances as i64) as i32,
            utilization,
        })
    }

    /// Read path: `getUserResourceUsage(userId)`
    pub async fn get_user_usage(&self, user_id: &str) -> CacheResult<UserUsage> {
        let mut conn = self.pool.get().await?;

        let threads_in_use = conn.get_int(&user_threads_key(user_id)).await?.max(0);
        let jobs_started_in_window = conn.get_int(&user_jobs_key(user_id)).await?;

        Ok(UserUsage {
            threads_in_use,
            jobs_started_in_window,
        })
    }

    /// Quota gate used by the priority engine's execution gating (§4.2)
    pub fn satisfies_quota(&self, usage: &UserUsage, estimated_threads: i32) -> bool {
        quota_satisfied(&self.config, usage, estimated_threads)
    }
}

/// Pure quota check, split out from [`ResourceLedger`] so it can be exercised
/// without a live Redis connection.
fn quota_satisfied(config: &ResourceLedgerConfig, usage: &UserUsage, estimated_threads: i32) -> bool {
    usage.threads_in_use + estimated_threads as i64 <= config.max_threads_per_window
        && usage.jobs_started_in_window < config.max_jobs_per_window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_capacity_total_threads() {
        let capacity = WorkerCapacity {
            total_instances: 2,
            max_threads_per_instance: 10,
        };
        assert_eq!(capacity.total_threads(), 20);
    }

    #[test]
    fn test_available_threads_never_negative() {
        let status = WorkerResourceStatus {
            total_instances: 1,
            total_threads: 10,
            used_threads: 15,
            used_instances: 1,
            utilization: 1.5,
        };
        assert_eq!(status.available_threads(), 0);
    }

    #[test]
    fn test_quota_gate_at_exact_limit() {
        let config = ResourceLedgerConfig {
            cluster_ttl_secs: 3600,
            time_window_seconds: 3600,
            max_threads_per_window: 50,
            max_jobs_per_window: 10,
        };

        let usage = UserUsage {
            threads_in_use: 49,
            jobs_started_in_window: 0,
        };
        assert!(quota_satisfied(&config, &usage, 1));
        assert!(!quota_satisfied(&config, &usage, 2));
    }

    #[test]
    fn test_quota_gate_blocks_at_job_limit() {
        let config = ResourceLedgerConfig {
            cluster_ttl_secs: 3600,
            time_window_seconds: 3600,
            max_threads_per_window: 50,
            max_jobs_per_window: 10,
        };

        let usage = UserUsage {
            threads_in_use: 0,
            jobs_started_in_window: 10,
        };
        assert!(!quota_satisfied(&config, &usage, 1));
    }
}
