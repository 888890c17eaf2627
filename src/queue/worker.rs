//! Lane consumer loop.
//!
//! One task per lane claims jobs one at a time, decodes the payload, and
//! hands it to the lane's handler. Outcome bookkeeping goes back through the
//! queue so retry/dead-letter policy lives in one place.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::db::DbError;
use crate::error::WorkerError;

use super::{JobPayload, Lane, Queue};

/// How often an idle consumer re-checks its lane.
const POLL_INTERVAL_SECS: u64 = 2;

/// Handles decoded job payloads for one lane.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: JobPayload) -> Result<(), WorkerError>;
}

/// Claim and process at most one job. Returns whether a job was claimed.
pub async fn process_next(
    queue: &Queue,
    lane: Lane,
    handler: &dyn JobHandler,
) -> Result<bool, DbError> {
    let job = match queue.claim_next(lane)? {
        Some(job) => job,
        None => return Ok(false),
    };

    log::info!(
        "lane {}: running {} job {} (attempt {}/{})",
        lane.as_str(),
        job.kind,
        job.id,
        job.attempts,
        job.max_attempts
    );

    let outcome = match serde_json::from_str::<JobPayload>(&job.payload) {
        Ok(payload) => handler.handle(payload).await,
        Err(e) => Err(WorkerError::InvalidPayload(e.to_string())),
    };

    match outcome {
        Ok(()) => queue.complete(&job)?,
        Err(err) => queue.fail(&job, &err.to_string(), err.is_permanent())?,
    }

    Ok(true)
}

/// Single consumer loop for one lane. Strictly serial: the next claim only
/// happens after the previous job's outcome has been recorded.
pub async fn run_lane_worker(queue: Arc<Queue>, lane: Lane, handler: Arc<dyn JobHandler>) {
    log::info!("lane {}: consumer started", lane.as_str());

    loop {
        match process_next(queue.as_ref(), lane, handler.as_ref()).await {
            Ok(true) => {} // look for the next job right away
            Ok(false) => tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await,
            Err(e) => {
                log::error!("lane {}: queue access failed: {}", lane.as_str(), e);
                tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
            }
        }
    }
}
