//! Durable persistence for queued jobs.
//!
//! Claims are transactional: SELECT and the queued→running flip happen in
//! one transaction, so a crash mid-claim leaves either a queued row or a
//! running row for startup recovery, never a lost job.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::db::{DbError, Store};

use super::{Job, JobPayload, Lane};

/// Base delay before a failed job becomes runnable again; doubles with each
/// failed attempt.
const RETRY_BASE_SECS: i64 = 30;

/// Handle over the `jobs` table.
pub struct Queue {
    store: Arc<Store>,
    max_attempts: u32,
}

impl Queue {
    pub fn new(store: Arc<Store>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Durably record a job and return its id. Execution happens later on
    /// the lane's consumer; the row is the only handoff.
    pub fn enqueue(&self, lane: Lane, payload: &JobPayload) -> Result<String, DbError> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_string(payload)?;
        let now = Utc::now().to_rfc3339();

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO jobs
                    (id, lane, kind, payload, state, attempts, max_attempts,
                     run_after, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'queued', 0, ?5, ?6, ?6, ?6)",
                params![id, lane.as_str(), payload.kind(), body, self.max_attempts, now],
            )
        })?;

        log::debug!(
            "enqueued {} job {} on lane {} for user {}",
            payload.kind(),
            id,
            lane.as_str(),
            payload.user_id()
        );
        Ok(id)
    }

    /// Claim the oldest runnable job on a lane, flipping it to `running` and
    /// counting the execution. Returns `None` when the lane has nothing due.
    pub fn claim_next(&self, lane: Lane) -> Result<Option<Job>, DbError> {
        let now = Utc::now().to_rfc3339();

        self.store.with_transaction(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, payload, attempts, max_attempts
                 FROM jobs
                 WHERE lane = ?1 AND state = 'queued' AND run_after <= ?2
                 ORDER BY created_at ASC, id ASC
                 LIMIT 1",
            )?;
            let mut rows = stmt.query_map(params![lane.as_str(), now], |row| {
                Ok(Job {
                    id: row.get(0)?,
                    kind: row.get(1)?,
                    payload: row.get(2)?,
                    attempts: row.get(3)?,
                    max_attempts: row.get(4)?,
                })
            })?;

            let job = match rows.next() {
                Some(row) => row?,
                None => return Ok(None),
            };

            conn.execute(
                "UPDATE jobs
                 SET state = 'running', attempts = attempts + 1, updated_at = ?1
                 WHERE id = ?2",
                params![now, job.id],
            )?;

            Ok(Some(Job {
                attempts: job.attempts + 1,
                ..job
            }))
        })
    }

    /// Mark a claimed job as completed.
    pub fn complete(&self, job: &Job) -> Result<(), DbError> {
        self.store.with_conn(|conn| {
            conn.execute(
                "UPDATE jobs SET state = 'completed', updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), job.id],
            )
        })?;
        Ok(())
    }

    /// Record a handler failure. Retryable failures requeue with backoff
    /// until the attempt budget is exhausted; permanent failures and
    /// exhausted jobs are parked as `failed`.
    pub fn fail(&self, job: &Job, error: &str, permanent: bool) -> Result<(), DbError> {
        let now = Utc::now();

        if permanent || job.attempts >= job.max_attempts {
            self.store.with_conn(|conn| {
                conn.execute(
                    "UPDATE jobs SET state = 'failed', last_error = ?1, updated_at = ?2
                     WHERE id = ?3",
                    params![error, now.to_rfc3339(), job.id],
                )
            })?;
            log::error!(
                "job {} ({}) dead-lettered after {} attempt(s): {}",
                job.id,
                job.kind,
                job.attempts,
                error
            );
        } else {
            let delay_secs =
                RETRY_BASE_SECS.saturating_mul(1 << (job.attempts.saturating_sub(1)).min(6));
            let run_after = now + Duration::seconds(delay_secs);

            self.store.with_conn(|conn| {
                conn.execute(
                    "UPDATE jobs
                     SET state = 'queued', last_error = ?1, run_after = ?2, updated_at = ?3
                     WHERE id = ?4",
                    params![error, run_after.to_rfc3339(), now.to_rfc3339(), job.id],
                )
            })?;
            log::warn!(
                "job {} ({}) failed on attempt {}/{}, retrying in {}s: {}",
                job.id,
                job.kind,
                job.attempts,
                job.max_attempts,
                delay_secs,
                error
            );
        }
        Ok(())
    }

    /// Requeue jobs left `running` by a previous process. Called once at
    /// startup before consumers start; at-least-once delivery means the
    /// handlers tolerate the re-run.
    pub fn requeue_stale(&self) -> Result<usize, DbError> {
        let now = Utc::now().to_rfc3339();
        let requeued = self.store.with_conn(|conn| {
            conn.execute(
                "UPDATE jobs SET state = 'queued', run_after = ?1, updated_at = ?1
                 WHERE state = 'running'",
                params![now],
            )
        })?;

        if requeued > 0 {
            log::warn!("requeued {} job(s) left running by a previous run", requeued);
        }
        Ok(requeued)
    }
}
