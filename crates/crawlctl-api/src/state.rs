use crawlctl_core::cache::{LiveStatusCache, ResourceLedger, StreamTransport};
use crawlctl_core::jobs::{Estimator, PriorityEngine};
use crawlctl_core::repository::JobRepository;
use std::sync::Arc;

/// Shared application state handed to every route handler: the Durable Job
/// Store repository, the admission engine's pending set, and handles onto
/// the two Redis-backed subsystems and the transport.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobRepository>,
    pub engine: Arc<PriorityEngine>,
    pub estimator: Arc<Estimator>,
    pub live_status: Arc<LiveStatusCache>,
    pub resource_ledger: Arc<ResourceLedger>,
    pub transport: Arc<StreamTransport>,
}

impl AppState {
    pub fn new(
        jobs: Arc<JobRepository>,
        engine: Arc<PriorityEngine>,
        estimator: Arc<Estimator>,
        live_status: Arc<LiveStatusCache>,
        resource_ledger: Arc<ResourceLedger>,
        transport: Arc<StreamTransport>,
    ) -> Self {
        Self {
            jobs,
            engine,
            estimator,
            live_status,
            resource_ledger,
            transport,
        }
    }
}
