//! Admission & Priority Engine (§4.2): the in-memory pending set, its
//! scoring policy, and execution gating. Safe for concurrent
//! insert/remove/iterate-snapshot — the pending map is a [`DashMap`], not a
//! single-writer structure (§5).

use crate::cache::resource_ledger::{ResourceLedger, WorkerCapacity, WorkerResourceStatus};
use crate::jobs::job::{JobId, PrioritizedTask, ResourceEstimate};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

const MAX_WAIT_MS: i64 = 300_000;
const QUOTA_BLOCKED_SCORE: f64 = 1000.0;

/// The core scheduler's pending-task state
pub struct PriorityEngine {
    tasks: DashMap<JobId, PrioritizedTask>,
    urls: DashMap<JobId, Vec<String>>,
}

impl PriorityEngine {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
            urls: DashMap::new(),
        }
    }

    /// Insert a freshly-intaken task into the pending set
    pub fn insert(
        &self,
        job_id: JobId,
        user_id: Option<String>,
        urls: Vec<String>,
        estimate: ResourceEstimate,
    ) {
        let url_count = urls.len() as i32;
        let task = PrioritizedTask {
            job_id: job_id.clone(),
            user_id,
            url_count,
            estimate,
            submit_time: Utc::now(),
            priority_score: 0.0,
            can_execute: false,
        };
        self.urls.insert(job_id.clone(), urls);
        self.tasks.insert(job_id, task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.tasks.contains_key(job_id)
    }

    /// Distinct user ids currently represented in the pending set, used by
    /// the dispatch loop to fetch per-user usage before scoring (§4.1)
    pub fn pending_user_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .tasks
            .iter()
            .filter_map(|entry| entry.value().user_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Remove a task without dispatching it (e.g. graceful shutdown drain)
    pub fn remove(&self, job_id: &str) -> Option<(PrioritizedTask, Vec<String>)> {
        let task = self.tasks.remove(job_id)?.1;
        let urls = self.urls.remove(job_id)?.1;
        Some((task, urls))
    }

    /// Score every pending task against a resource snapshot, then remove and
    /// return the first executable one (lowest score wins). Returns `None`
    /// if the set is empty or nothing currently clears the execution gate.
    ///
    /// `user_usage` supplies each relevant user's current thread/job usage;
    /// callers fetch it from the [`ResourceLedger`] before calling this so
    /// the scan itself stays synchronous and cheap.
    pub fn next_executable(
        &self,
        status: WorkerResourceStatus,
        capacity: WorkerCapacity,
        ledger: &ResourceLedger,
        usage_by_user: &dashmap::DashMap<String, crate::cache::resource_ledger::UserUsage>,
    ) -> Option<(PrioritizedTask, Vec<String>)> {
        let now = Utc::now();

        let mut scored: Vec<(String, f64, bool)> = self
            .tasks
            .iter()
            .map(|entry| {
                let task = entry.value();
                let (score, executable) = score_task(task, now, status, capacity, ledger, usage_by_user);
                (task.job_id.clone(), score, executable)
            })
            .collect();

        scored.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let ta = self.tasks.get(&a.0).map(|t| t.submit_time);
                    let tb = self.tasks.get(&b.0).map(|t| t.submit_time);
                    ta.cmp(&tb)
                })
                .then_with(|| a.0.cmp(&b.0))
        });

        let winner = scored.into_iter().find(|(_, _, executable)| *executable)?;

        let mut entry = self.tasks.get_mut(&winner.0)?;
        entry.priority_score = winner.1;
        entry.can_execute = true;
        drop(entry);

        self.remove(&winner.0)
    }
}

impl Default for PriorityEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn score_task(
    task: &PrioritizedTask,
    now: DateTime<Utc>,
    status: WorkerResourceStatus,
    capacity: WorkerCapacity,
    ledger: &ResourceLedger,
    usage_by_user: &dashmap::DashMap<String, crate::cache::resource_ledger::UserUsage>,
) -> (f64, bool) {
    let quota_ok = match &task.user_id {
        Some(user_id) => match usage_by_user.get(user_id) {
            Some(usage) => ledger.satisfies_quota(&usage, task.estimate.estimated_threads),
            None => true,
        },
        None => true,
    };

    if !quota_ok {
        return (QUOTA_BLOCKED_SCORE, false);
    }

    let resource = task.estimate.resource_score;
    let wait_ms = (now - task.submit_time).num_milliseconds().max(0);
    let wait_norm = (wait_ms as f64 / MAX_WAIT_MS as f64).min(1.0);
    let score = 0.7 * resource - 0.3 * wait_norm;

    let capacity_ok = status.available_threads() >= task.estimate.estimated_threads
        && status.available_instances() > 0;

    (score, capacity_ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::resource_ledger::UserUsage;
    use crate::jobs::job::ResourceEstimate;

    fn estimate(threads: i32, score: f64) -> ResourceEstimate {
        ResourceEstimate {
            estimated_threads: threads,
            estimated_duration_ms: 1000,
            resource_score: score,
        }
    }

    #[test]
    fn test_insert_and_len() {
        let engine = PriorityEngine::new();
        engine.insert(
            "a".to_string(),
            None,
            vec!["https://x".to_string()],
            estimate(1, 0.1),
        );
        assert_eq!(engine.len(), 1);
        assert!(engine.contains("a"));
    }

    #[test]
    fn test_remove_returns_task_and_urls() {
        let engine = PriorityEngine::new();
        engine.insert("a".to_string(), None, vec!["https://x".to_string()], estimate(1, 0.1));
        let (task, urls) = engine.remove("a").unwrap();
        assert_eq!(task.job_id, "a");
        assert_eq!(urls, vec!["https://x".to_string()]);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_priority_monotonicity_older_wins() {
        // Two identical estimates/users; older submit_time should score <= younger.
        let now = Utc::now();
        let older = PrioritizedTask {
            job_id: "old".to_string(),
            user_id: None,
            url_count: 5,
            estimate: estimate(1, 0.3),
            submit_time: now - chrono::Duration::seconds(10),
            priority_score: 0.0,
            can_execute: false,
        };
        let younger = PrioritizedTask {
            job_id: "new".to_string(),
            user_id: None,
            url_count: 5,
            estimate: estimate(1, 0.3),
            submit_time: now,
            priority_score: 0.0,
            can_execute: false,
        };

        let status = WorkerResourceStatus {
            total_instances: 1,
            total_threads: 10,
            used_threads: 0,
            used_instances: 0,
            utilization: 0.0,
        };
        let capacity = WorkerCapacity {
            total_instances: 1,
            max_threads_per_instance: 10,
        };
        let usage = dashmap::DashMap::new();
        let redis_config = crate::cache::ResourceLedgerConfig::default();

        // ResourceLedger::satisfies_quota doesn't touch Redis, so we can
        // construct it purely to exercise the pure scoring path via a
        // mocked-out pool is unnecessary; score_task only calls
        // `ledger.satisfies_quota`, which is pure, but constructing a
        // ResourceLedger needs a RedisPool. We test the quota-free path by
        // using tasks with no userId, which skips the ledger call entirely.
        let _ = (redis_config, usage);

        let (older_score, _) = score_task_no_ledger(&older, now, status, capacity);
        let (younger_score, _) = score_task_no_ledger(&younger, now, status, capacity);
        assert!(older_score <= younger_score);
    }

    // Test-only helper that mirrors `score_task`'s scoring math without
    // requiring a live ResourceLedger, since the quota branch is unreachable
    // when `user_id` is `None`.
    fn score_task_no_ledger(
        task: &PrioritizedTask,
        now: DateTime<Utc>,
        status: WorkerResourceStatus,
        _capacity: WorkerCapacity,
    ) -> (f64, bool) {
        let resource = task.estimate.resource_score;
        let wait_ms = (now - task.submit_time).num_milliseconds().max(0);
        let wait_norm = (wait_ms as f64 / MAX_WAIT_MS as f64).min(1.0);
        let score = 0.7 * resource - 0.3 * wait_norm;
        let capacity_ok = status.available_threads() >= task.estimate.estimated_threads
            && status.available_instances() > 0;
        (score, capacity_ok)
    }
}
