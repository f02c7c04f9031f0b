//! Wires the Durable Job Store, the two Redis-backed subsystems, and the
//! work-queue transport into a running control plane: the intake loop, the
//! dispatch loop, and the HTTP server all share one [`AppState`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crawlctl_core::cache::resource_ledger::WorkerCapacity;
use crawlctl_core::cache::{LiveStatusCache, RedisPool, ResourceLedger, StreamTransport};
use crawlctl_core::repository::{create_pool, JobRepository};
use crawlctl_core::{
    Config, DefaultHttpExecutor, DispatchLoop, Error, Estimator, IntakeLoop, PriorityEngine, Result,
};
use tracing::{error, info};

use crate::routes::create_router;
use crate::state::AppState;

pub async fn run(config: Config) -> Result<()> {
    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| Error::Config(format!("Invalid host: {}", e)))?,
        config.server.port,
    ));

    let app_state = create_app_state(&config).await?;

    spawn_intake_loop(&config, &app_state);
    spawn_dispatch_loop(&config, &app_state);

    let app = create_router(app_state);

    info!("crawlctl API server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::transport(e.to_string()))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::transport(e.to_string()))?;

    Ok(())
}

async fn create_app_state(config: &Config) -> Result<AppState> {
    let pool = create_pool(
        &config.database.host,
        config.database.port,
        &config.database.database,
        &config.database.username,
        &config.database.password,
        config.database.pool_size,
    )
    .await?;

    crawlctl_core::auto_migrate(&pool).await?;

    let jobs = Arc::new(JobRepository::new(pool.clone()));
    let estimator = Arc::new(Estimator::new(pool));

    let redis = RedisPool::new(config.cache.redis.clone()).await?;

    let live_status = Arc::new(LiveStatusCache::new(redis.clone(), config.cache.live_status.clone()));
    let resource_ledger = Arc::new(ResourceLedger::new(redis.clone(), config.cache.resource_ledger.clone()));
    let transport = Arc::new(StreamTransport::new(redis, config.cache.transport.clone()));

    transport.ensure_groups().await?;

    let engine = Arc::new(PriorityEngine::new());

    Ok(AppState::new(jobs, engine, estimator, live_status, resource_ledger, transport))
}

/// Independent loop polling the transport and admitting work into the
/// engine's pending set. Runs until the process exits; failures are logged
/// and the loop backs off rather than tearing down the server (§4.1 intake
/// semantics).
fn spawn_intake_loop(config: &Config, app_state: &AppState) {
    let intake = IntakeLoop::new(
        Arc::clone(&app_state.transport),
        Arc::clone(&app_state.estimator),
        Arc::clone(&app_state.engine),
        format!("crawlctl-{}", uuid::Uuid::new_v4()),
    );

    let poll_block_ms = config.cache.transport.poll_block_ms;

    tokio::spawn(async move {
        loop {
            match intake.poll_once().await {
                Ok(0) => {}
                Ok(n) => info!(admitted = n, "intake: batch admitted"),
                Err(e) => {
                    error!(error = %e, "intake: poll failed, backing off");
                    tokio::time::sleep(Duration::from_millis(poll_block_ms)).await;
                }
            }
        }
    });
}

/// The periodic dispatch tick, driven by [`DispatchLoop`]. The executor
/// wired in here is the default standalone HTTP fetcher; swap it for a
/// dedicated crawl collaborator in deployments that need sanitisation or a
/// headless renderer.
fn spawn_dispatch_loop(config: &Config, app_state: &AppState) {
    let capacity = WorkerCapacity {
        total_instances: config.crawler.worker.total_instances,
        max_threads_per_instance: config.crawler.worker.max_threads_per_instance,
    };

    let dispatch = Arc::new(DispatchLoop::new(
        Arc::clone(&app_state.engine),
        Arc::clone(&app_state.resource_ledger),
        capacity,
        Arc::clone(&app_state.jobs),
        Arc::clone(&app_state.live_status),
        Arc::new(DefaultHttpExecutor::new()),
        Duration::from_millis(config.crawler.dispatch_tick_ms),
    ));

    dispatch.start();
}
