//! Job intake, admission, and dispatch — the control-plane's scheduling core.
//!
//! - [`job`]: shared domain types (the durable `Job` record, wire payloads,
//!   the in-memory `PrioritizedTask`)
//! - [`estimator`]: historical-average resource estimation
//! - [`priority`]: the admission engine's pending set and scoring policy
//! - [`crawl`]: the external crawl collaborator boundary
//! - [`intake`]: consumes transport deliveries into the pending set
//! - [`dispatch`]: the periodic tick that executes admitted tasks

pub mod crawl;
pub mod dispatch;
pub mod estimator;
pub mod intake;
pub mod job;
pub mod priority;

pub use crawl::{CrawlExecutor, CrawlOutcome, DefaultHttpExecutor, ProgressReporter};
pub use dispatch::{DispatchLoop, DispatchState};
pub use estimator::Estimator;
pub use intake::IntakeLoop;
pub use job::{new_job_id, Job, JobId, JobStatus, PrioritizedTask, ResourceEstimate, TaskMessage};
pub use priority::PriorityEngine;
