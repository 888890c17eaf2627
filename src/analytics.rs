//! Re-inference over already-mirrored timesheets.
//!
//! Analytics runs never touch the tracker: they read the local mirror for a
//! window, group it, and send it out with `kind = "analytics"`. Settings are
//! not forwarded here.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::db::{timesheets, Store};
use crate::error::WorkerError;
use crate::ml::Dispatcher;
use crate::queue::{AnalyticsParams, JobHandler, JobPayload};
use crate::sync::weeks::group_by_week;

/// Window when the caller gives no bounds, in days.
const DEFAULT_LOOKBACK_DAYS: i64 = 30;

pub struct AnalyticsWorker {
    store: Arc<Store>,
    dispatcher: Dispatcher,
}

impl AnalyticsWorker {
    pub fn new(store: Arc<Store>, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Dispatch one analytics batch for `user_id`.
    ///
    /// An empty window is a success without a dispatch. An inference
    /// failure propagates, so the job goes back to the queue and retries.
    pub async fn run_analytics(
        &self,
        user_id: &str,
        params: Option<AnalyticsParams>,
    ) -> Result<(), WorkerError> {
        let params = params.unwrap_or_default();
        let until = params.until.unwrap_or_else(Utc::now);
        let since = params
            .since
            .unwrap_or_else(|| until - chrono::Duration::days(DEFAULT_LOOKBACK_DAYS));

        let batch = self
            .store
            .with_conn(|conn| timesheets::list_for_window(conn, user_id, &since, &until))?;

        if batch.is_empty() {
            log::info!("analytics for {}: window is empty, nothing to send", user_id);
            return Ok(());
        }

        let weeks = group_by_week(&batch);
        log::info!(
            "analytics for {}: {} record(s) across {} week(s)",
            user_id,
            batch.len(),
            weeks.len()
        );

        self.dispatcher
            .dispatch(user_id, "analytics", batch, weeks, None)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl JobHandler for AnalyticsWorker {
    async fn handle(&self, payload: JobPayload) -> Result<(), WorkerError> {
        match payload {
            JobPayload::AnalyticsRun { user_id, params } => {
                self.run_analytics(&user_id, params).await
            }
            other => Err(WorkerError::InvalidPayload(format!(
                "analytics lane cannot run {} jobs",
                other.kind()
            ))),
        }
    }
}
