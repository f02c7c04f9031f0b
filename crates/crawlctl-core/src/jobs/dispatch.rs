//! Job Intake & Dispatch — the dispatch tick (§4.1 steps 1-4). Periodically
//! scores the admission engine's pending set against current resource
//! status, hands the winner to a [`CrawlExecutor`], and writes the terminal
//! result back to the Durable Job Store, mirroring progress through the
//! Live Status Cache along the way.

use crate::cache::live_status::{LiveStatus, LiveStatusCache};
use crate::cache::resource_ledger::{ResourceLedger, UserUsage, WorkerCapacity};
use crate::jobs::crawl::{CrawlExecutor, ProgressReporter};
use crate::jobs::job::JobStatus;
use crate::jobs::priority::PriorityEngine;
use crate::repository::traits::JobRepositoryTrait;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

/// Dispatch loop state, mirroring the start/stop lifecycle the rest of the
/// codebase uses for its background workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

pub struct DispatchLoop<R: JobRepositoryTrait> {
    engine: Arc<PriorityEngine>,
    ledger: Arc<ResourceLedger>,
    capacity: WorkerCapacity,
    jobs: Arc<R>,
    live_status: Arc<LiveStatusCache>,
    executor: Arc<dyn CrawlExecutor>,
    tick: Duration,
    state: Arc<RwLock<DispatchState>>,
}

impl<R: JobRepositoryTrait> DispatchLoop<R> {
    pub fn new(
        engine: Arc<PriorityEngine>,
        ledger: Arc<ResourceLedger>,
        capacity: WorkerCapacity,
        jobs: Arc<R>,
        live_status: Arc<LiveStatusCache>,
        executor: Arc<dyn CrawlExecutor>,
        tick: Duration,
    ) -> Self {
        Self {
            engine,
            ledger,
            capacity,
            jobs,
            live_status,
            executor,
            tick,
            state: Arc::new(RwLock::new(DispatchState::Starting)),
        }
    }

    /// Spawn the periodic dispatch loop
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            *self.state.write().await = DispatchState::Running;
            let mut ticker = interval(self.tick);

            loop {
                ticker.tick().await;
                if *self.state.read().await != DispatchState::Running {
                    break;
                }

                if let Err(e) = self.run_tick().await {
                    error!(error = %e, "dispatch tick failed");
                }
            }

            *self.state.write().await = DispatchState::Stopped;
        })
    }

    pub async fn stop(&self) {
        *self.state.write().await = DispatchState::Stopping;
    }

    /// One iteration: score, pick a winner, hand it off for execution.
    /// Execution itself runs detached so a slow crawl never delays the next
    /// tick's scoring pass.
    pub async fn run_tick(&self) -> crate::Result<()> {
        if self.engine.is_empty() {
            return Ok(());
        }

        let status = self.ledger.get_current_resource_status(self.capacity).await?;

        let usage_by_user: DashMap<String, UserUsage> = DashMap::new();
        for user_id in self.engine.pending_user_ids() {
            let usage = self.ledger.get_user_usage(&user_id).await?;
            usage_by_user.insert(user_id, usage);
        }

        let Some((task, urls)) = self.engine.next_executable(status, self.capacity, &self.ledger, &usage_by_user)
        else {
            return Ok(());
        };

        self.ledger
            .register_start(&task.job_id, task.user_id.as_deref(), task.estimate.estimated_threads)
            .await?;

        if let Err(e) = self.jobs.mark_running(&task.job_id).await {
            error!(job_id = %task.job_id, error = %e, "failed to mark job RUNNING, releasing credits");
            self.ledger
                .release(&task.job_id, task.user_id.as_deref(), task.estimate.estimated_threads)
                .await?;
            return Err(e);
        }

        self.live_status
            .set(
                &task.job_id,
                &LiveStatus {
                    status: JobStatus::Running,
                    message: "started".to_string(),
                    urls_submitted: task.url_count,
                    urls_succeeded: 0,
                    urls_failed: 0,
                },
            )
            .await?;

        let jobs = Arc::clone(&self.jobs);
        let ledger = Arc::clone(&self.ledger);
        let live_status = Arc::clone(&self.live_status);
        let executor = Arc::clone(&self.executor);
        let job_id = task.job_id.clone();
        let user_id = task.user_id.clone();
        let estimated_threads = task.estimate.estimated_threads;
        let url_count = task.url_count;

        tokio::spawn(async move {
            let reporter = LiveStatusReporter {
                live_status: Arc::clone(&live_status),
                job_id: job_id.clone(),
                urls_submitted: url_count,
            };

            let started = Instant::now();
            let outcome = executor.crawl(&job_id, &urls, &reporter).await;
            let elapsed_ms = started.elapsed().as_millis() as i64;

            let (final_status, urls_succeeded, urls_failed, result_html) = match outcome {
                Ok(outcome) => (
                    JobStatus::Succeeded,
                    outcome.urls_succeeded,
                    outcome.urls_failed,
                    Some(outcome.result_html),
                ),
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "crawl execution failed");
                    (JobStatus::Failed, 0, url_count, None)
                }
            };

            if let Err(e) = jobs
                .mark_terminal(
                    &job_id,
                    final_status,
                    urls_succeeded,
                    urls_failed,
                    elapsed_ms,
                    result_html.as_deref(),
                )
                .await
            {
                error!(job_id = %job_id, error = %e, "failed to write terminal job state");
            }

            if let Err(e) = live_status.delete(&job_id).await {
                error!(job_id = %job_id, error = %e, "failed to delete live status entry on completion");
            }

            if let Err(e) = ledger.release(&job_id, user_id.as_deref(), estimated_threads).await {
                error!(job_id = %job_id, error = %e, "failed to release resource ledger credits");
            }

            info!(job_id = %job_id, status = %final_status, "dispatch: job finished");
        });

        Ok(())
    }
}

/// Mirrors crawl progress into the Live Status Cache as URLs complete
struct LiveStatusReporter {
    live_status: Arc<LiveStatusCache>,
    job_id: String,
    urls_submitted: i32,
}

#[async_trait]
impl ProgressReporter for LiveStatusReporter {
    async fn report(&self, message: &str, urls_succeeded: i32, urls_failed: i32) {
        let status = LiveStatus {
            status: JobStatus::Running,
            message: message.to_string(),
            urls_submitted: self.urls_submitted,
            urls_succeeded,
            urls_failed,
        };

        if let Err(e) = self.live_status.set(&self.job_id, &status).await {
            warn!(job_id = %self.job_id, error = %e, "failed to mirror progress to live status cache");
        }
    }
}
