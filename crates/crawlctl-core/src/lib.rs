pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod repository;

// Re-export commonly used types
pub use config::Config;
pub use db::migrate::{auto_migrate, DbStatus, Migrator};
pub use error::{Error, ErrorEnvelope, Result};
pub use jobs::{
    CrawlExecutor, CrawlOutcome, DefaultHttpExecutor, DispatchLoop, Estimator, IntakeLoop, Job,
    JobId, JobStatus, PrioritizedTask, PriorityEngine, ProgressReporter, ResourceEstimate,
    TaskMessage,
};
pub use repository::{create_pool, JobRepository, JobRepositoryTrait};

/// Current version of crawlctl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::invalid_input("test validation error");
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.category(), "invalid_input");
    }
}
