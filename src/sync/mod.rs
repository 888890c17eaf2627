//! Tracker reconciliation worker.
//!
//! Pulls a window of timesheets from the user's tracker, normalizes and
//! upserts them, then hands the batch to the inference dispatcher. The pull
//! side is generic over [`PageSource`] so the whole pipeline runs against
//! in-process fakes in tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::{self, Store, SyncStatus, TimesheetRecord, UserSettings};
use crate::error::WorkerError;
use crate::ml::{Dispatcher, SanitizedSettings};
use crate::queue::{JobHandler, JobPayload};
use crate::tracker::{PageCursor, PageSource, RawTimesheet, TrackerClient};

pub mod normalize;
pub mod weeks;

use normalize::normalize;
use weeks::group_by_week;

/// Rows per page when pulling timesheets.
const PAGE_SIZE: u32 = 200;

/// How far back a first sync reaches, in days.
const INITIAL_LOOKBACK_DAYS: i64 = 365;

/// Default window for a re-sync with no explicit bounds, in hours.
const REGULAR_LOOKBACK_HOURS: i64 = 24;

pub struct SyncWorker {
    store: Arc<Store>,
    dispatcher: Dispatcher,
    http_timeout: Duration,
    page_size: u32,
}

impl SyncWorker {
    pub fn new(store: Arc<Store>, dispatcher: Dispatcher, http_timeout: Duration) -> Self {
        Self {
            store,
            dispatcher,
            http_timeout,
            page_size: PAGE_SIZE,
        }
    }

    /// Full backfill for a newly connected user.
    pub async fn run_initial_sync(&self, user_id: &str) -> Result<(), WorkerError> {
        let until = Utc::now();
        let since = until - chrono::Duration::days(INITIAL_LOOKBACK_DAYS);
        self.sync_window(user_id, since, until).await
    }

    /// Scheduled re-sync. Missing bounds default to the trailing day.
    pub async fn run_regular_sync(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), WorkerError> {
        let until = until.unwrap_or_else(Utc::now);
        let since = since.unwrap_or_else(|| until - chrono::Duration::hours(REGULAR_LOOKBACK_HOURS));
        self.sync_window(user_id, since, until).await
    }

    async fn sync_window(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<(), WorkerError> {
        let settings = self
            .store
            .with_conn(|conn| db::settings::get_user_settings(conn, user_id))?
            .ok_or_else(|| WorkerError::MissingSettings(user_id.to_string()))?;

        log::info!(
            "syncing {} from {} to {}",
            user_id,
            since.to_rfc3339(),
            until.to_rfc3339()
        );

        let client = TrackerClient::new(
            &settings.tracker_url,
            &settings.tracker_api_key,
            self.http_timeout,
        )?;
        let source = client.timesheets(&since, &until);

        self.sync_from_source(user_id, &settings, &source).await
    }

    /// Reconcile everything `source` yields, dispatch the batch, and mark
    /// the user synced.
    ///
    /// A single bad row never sinks the run: its upsert failure is logged
    /// and the row still joins the inference batch. Fetch errors and the
    /// final status write propagate so the job retries.
    pub(crate) async fn sync_from_source<S>(
        &self,
        user_id: &str,
        settings: &UserSettings,
        source: &S,
    ) -> Result<(), WorkerError>
    where
        S: PageSource<Item = RawTimesheet>,
    {
        let mut cursor = PageCursor::new(source, self.page_size);
        let mut batch: Vec<TimesheetRecord> = Vec::new();
        let mut stored = 0usize;

        while let Some(page) = cursor.next_page().await? {
            for raw in page {
                let record = normalize(user_id, raw);
                let upserted = self
                    .store
                    .with_conn(|conn| db::timesheets::upsert_timesheet(conn, &record));
                match upserted {
                    Ok(()) => stored += 1,
                    Err(e) => log::warn!(
                        "upsert failed for timesheet {} of {}: {}",
                        record.external_id,
                        user_id,
                        e
                    ),
                }
                batch.push(record);
            }
        }

        log::info!(
            "stored {}/{} timesheet(s) for {}",
            stored,
            batch.len(),
            user_id
        );

        self.dispatch_batch(user_id, settings, batch).await;

        self.store
            .with_conn(|conn| db::sync_state::set_status(conn, user_id, SyncStatus::Synced))?;

        Ok(())
    }

    /// Hand the batch to the inference service. Dispatch failure is logged
    /// and swallowed: reconciliation already succeeded and must not be
    /// reverted or retried for the sake of inference.
    async fn dispatch_batch(
        &self,
        user_id: &str,
        settings: &UserSettings,
        batch: Vec<TimesheetRecord>,
    ) {
        let weeks = group_by_week(&batch);
        let sanitized = SanitizedSettings::from(settings);

        if let Err(e) = self
            .dispatcher
            .dispatch(user_id, "sync", batch, weeks, Some(sanitized))
            .await
        {
            log::error!("inference dispatch failed for {}: {}", user_id, e);
        }
    }
}

#[async_trait]
impl JobHandler for SyncWorker {
    async fn handle(&self, payload: JobPayload) -> Result<(), WorkerError> {
        match payload {
            JobPayload::InitialSync { user_id } => self.run_initial_sync(&user_id).await,
            JobPayload::RegularSync {
                user_id,
                since,
                until,
            } => self.run_regular_sync(&user_id, since, until).await,
            other => Err(WorkerError::InvalidPayload(format!(
                "sync lane cannot run {} jobs",
                other.kind()
            ))),
        }
    }
}
