//! Durable job queue over SQLite.
//!
//! Jobs are typed payloads on named lanes. Each lane has exactly one
//! consumer, so jobs within a lane run strictly serially. Delivery is
//! at-least-once: a job left `running` by a crash is requeued on startup,
//! and a handler failure retries with backoff until the attempt budget is
//! exhausted, after which the row is parked as `failed` (dead letter) and
//! only logged. Nothing downstream consumes dead letters.

pub mod store;
pub mod worker;

pub use store::Queue;
pub use worker::{run_lane_worker, JobHandler};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Queue lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Sync,
    Analytics,
}

impl Lane {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lane::Sync => "sync",
            Lane::Analytics => "analytics",
        }
    }
}

/// Optional window for an analytics run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
}

/// Typed job payloads. The serialized form is what lands in the `jobs`
/// table; a row whose payload no longer decodes is failed permanently at
/// dispatch rather than retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum JobPayload {
    /// Full backfill for a user who just connected the tracker.
    #[serde(rename_all = "camelCase")]
    InitialSync { user_id: String },

    /// Windowed sync; missing bounds default to the trailing 24 hours.
    #[serde(rename_all = "camelCase")]
    RegularSync {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        since: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        until: Option<DateTime<Utc>>,
    },

    /// Re-run inference over already-mirrored rows.
    #[serde(rename_all = "camelCase")]
    AnalyticsRun {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<AnalyticsParams>,
    },
}

impl JobPayload {
    /// Kind tag as stored in the `jobs.kind` column.
    pub fn kind(&self) -> &'static str {
        match self {
            JobPayload::InitialSync { .. } => "initial-sync",
            JobPayload::RegularSync { .. } => "regular-sync",
            JobPayload::AnalyticsRun { .. } => "analytics-run",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            JobPayload::InitialSync { user_id }
            | JobPayload::RegularSync { user_id, .. }
            | JobPayload::AnalyticsRun { user_id, .. } => user_id,
        }
    }
}

/// A claimed row from the `jobs` table.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub kind: String,
    pub payload: String,
    /// Executions so far, including the one in flight.
    pub attempts: u32,
    pub max_attempts: u32,
}
