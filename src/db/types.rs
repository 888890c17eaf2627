//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// Per-user sync status. `syncing` is set by the triggering side before a
/// job is enqueued; `synced` is written only after a fully successful pass.
/// A failed pass leaves the previous value in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(SyncStatus::Idle),
            "syncing" => Some(SyncStatus::Syncing),
            "synced" => Some(SyncStatus::Synced),
            _ => None,
        }
    }
}

/// A row from the `user_settings` table. Written by the settings surface,
/// read-only to this service.
///
/// Deliberately not `Serialize`: the tracker credential must never leave the
/// process. The projection that goes to the inference service is
/// `ml::SanitizedSettings`.
#[derive(Debug, Clone)]
pub struct UserSettings {
    pub user_id: String,
    pub tracker_url: String,
    pub tracker_api_key: String,
    pub project_settings: Option<serde_json::Value>,
    pub excluded_tags: Vec<String>,
    pub user_preferences: Option<serde_json::Value>,
}

/// A normalized timesheet mirrored from the tracker, keyed on
/// `(user_id, external_id)`. Timestamps are RFC 3339 in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimesheetRecord {
    pub user_id: String,
    pub external_id: i64,
    pub begin_at: String,
    pub end_at: Option<String>,
    pub duration_secs: Option<i64>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub activity_id: Option<i64>,
    pub activity_name: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub meta: Option<serde_json::Value>,
}

/// A row from the `ml_results` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlResult {
    pub id: i64,
    pub user_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub created_at: String,
}
