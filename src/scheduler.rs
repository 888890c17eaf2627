//! Cron-driven sync scheduling
//!
//! Two cadences share one loop: a daily pass that re-pulls a wide window and
//! a frequent pass that keeps the last day fresh. Each firing fans out over
//! every tracked user, marking them syncing and enqueuing one sync job per
//! user on the sync lane.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::config::Config;
use crate::db::{self, DbError, Store, SyncStatus};
use crate::queue::{JobPayload, Lane, Queue};

/// Poll interval for scheduler loop (1 minute)
const POLL_INTERVAL_SECS: u64 = 60;

/// Window the daily pass re-pulls, in days.
const DAILY_LOOKBACK_DAYS: i64 = 7;

/// Window the frequent pass re-pulls, in hours.
const FREQUENT_LOOKBACK_HOURS: i64 = 24;

/// One recurring sync pass.
struct Cadence {
    name: &'static str,
    schedule: Schedule,
    lookback: Duration,
    /// Scheduled instant of the last firing, used to dedupe within a minute.
    last_fired: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    store: Arc<Store>,
    queue: Arc<Queue>,
    tz: Tz,
    cadences: Vec<Cadence>,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, queue: Arc<Queue>, config: &Config) -> Result<Self, String> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| format!("Invalid timezone: {}", config.timezone))?;

        let cadences = vec![
            Cadence {
                name: "daily",
                schedule: parse_cron(&config.daily_cron)?,
                lookback: Duration::days(DAILY_LOOKBACK_DAYS),
                last_fired: None,
            },
            Cadence {
                name: "frequent",
                schedule: parse_cron(&config.frequent_cron)?,
                lookback: Duration::hours(FREQUENT_LOOKBACK_HOURS),
                last_fired: None,
            },
        ];

        Ok(Self {
            store,
            queue,
            tz,
            cadences,
        })
    }

    /// Run the scheduler loop indefinitely, checking cadences every minute.
    pub async fn run(mut self) {
        log::info!(
            "scheduler started ({} cadences, timezone {})",
            self.cadences.len(),
            self.tz
        );

        loop {
            tokio::time::sleep(std::time::Duration::from_secs(POLL_INTERVAL_SECS)).await;
            self.tick(Utc::now());
        }
    }

    /// Check every cadence against `now`, firing those that are due.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        for i in 0..self.cadences.len() {
            let Some(fired_at) = due_at(&self.cadences[i], self.tz, now) else {
                continue;
            };
            self.cadences[i].last_fired = Some(fired_at);

            let name = self.cadences[i].name;
            let lookback = self.cadences[i].lookback;
            log::info!("scheduler: {} cadence due ({})", name, fired_at);

            if let Err(e) = self.fan_out(name, now - lookback, now) {
                log::error!("scheduler: {} pass aborted: {}", name, e);
            }
        }
    }

    /// Enqueue one sync job per tracked user for the given window.
    ///
    /// Users are marked syncing before their job is enqueued. The first
    /// failure abandons the rest of the pass; the next firing picks the
    /// remaining users up again.
    fn fan_out(
        &self,
        cadence: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let users = self.store.with_conn(db::settings::list_user_ids)?;
        if users.is_empty() {
            log::debug!("scheduler: {} pass found no tracked users", cadence);
            return Ok(());
        }

        log::info!("scheduler: {} pass over {} user(s)", cadence, users.len());

        for user_id in users {
            self.store
                .with_conn(|conn| db::sync_state::set_status(conn, &user_id, SyncStatus::Syncing))?;
            self.queue.enqueue(
                Lane::Sync,
                &JobPayload::RegularSync {
                    user_id,
                    since: Some(since),
                    until: Some(until),
                },
            )?;
        }

        Ok(())
    }
}

/// Return the scheduled instant if the cadence is due at `now`.
///
/// A cadence is due when `now` falls within two minutes of a scheduled time
/// it has not fired for yet. The window absorbs poll jitter without letting
/// one scheduled minute fire twice.
fn due_at(cadence: &Cadence, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let now_local = now.with_timezone(&tz);

    let next = cadence
        .schedule
        .after(&(now_local - Duration::minutes(2)))
        .next()?;
    let next_utc = next.with_timezone(&Utc);

    if (now - next_utc).num_seconds().abs() >= 120 {
        return None;
    }
    if cadence.last_fired == Some(next_utc) {
        return None; // already fired for this scheduled minute
    }

    Some(next_utc)
}

/// Parse a cron expression
pub fn parse_cron(expr: &str) -> Result<Schedule, String> {
    // The cron crate expects 6 fields (with seconds), but we use 5-field format
    // Add "0" for seconds at the start
    let full_expr = format!("0 {}", expr);

    full_expr
        .parse::<Schedule>()
        .map_err(|e| format!("Invalid cron expression '{}': {}", expr, e))
}
