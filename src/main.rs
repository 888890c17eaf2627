//! timebeam daemon.
//!
//! One process runs the cron scheduler, the two lane consumers, and the
//! inference dispatcher. Triggers arrive out-of-band through the shared
//! SQLite queue (see `timebeam::api`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use timebeam::analytics::AnalyticsWorker;
use timebeam::config::{config_path, load_config};
use timebeam::db::Store;
use timebeam::ml::{Dispatcher, HttpInference};
use timebeam::queue::{run_lane_worker, Lane, Queue};
use timebeam::scheduler::Scheduler;
use timebeam::sync::SyncWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = config_path().map_err(|e| anyhow::anyhow!("Failed to locate config: {e}"))?;
    let config = load_config(&path).map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    let store = Arc::new(Store::open_at(Path::new(&config.database_path))?);

    let queue = Arc::new(Queue::new(store.clone(), config.max_job_attempts));
    let requeued = queue.requeue_stale()?;
    if requeued > 0 {
        log::info!(
            "requeued {} job(s) left running by a previous process",
            requeued
        );
    }

    let http_timeout = Duration::from_secs(config.http_timeout_secs);
    let provider = Arc::new(HttpInference::new(&config.inference_url, http_timeout)?);
    let dispatcher = Dispatcher::new(store.clone(), provider);

    let sync_worker = Arc::new(SyncWorker::new(
        store.clone(),
        dispatcher.clone(),
        http_timeout,
    ));
    let analytics_worker = Arc::new(AnalyticsWorker::new(store.clone(), dispatcher));

    let scheduler = Scheduler::new(store.clone(), queue.clone(), &config)
        .map_err(|e| anyhow::anyhow!("Failed to build scheduler: {e}"))?;

    tokio::spawn(scheduler.run());
    tokio::spawn(run_lane_worker(queue.clone(), Lane::Sync, sync_worker));
    tokio::spawn(run_lane_worker(
        queue.clone(),
        Lane::Analytics,
        analytics_worker,
    ));

    log::info!("timebeam started (db {})", config.database_path);

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");

    Ok(())
}
