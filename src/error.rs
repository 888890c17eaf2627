//! Error types for job execution
//!
//! Errors are classified by permanence:
//! - Permanent: missing settings, malformed payloads. The job is failed
//!   immediately and never requeued.
//! - Everything else: tracker/database/inference failures. The queue retries
//!   these with backoff until the job's attempt budget runs out.

use thiserror::Error;

use crate::db::DbError;
use crate::ml::InferenceError;
use crate::tracker::TrackerError;

/// Error type for sync and analytics job handlers.
#[derive(Debug, Error)]
pub enum WorkerError {
    // Permanent errors
    #[error("No settings stored for user {0}")]
    MissingSettings(String),

    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    // Retryable at the queue layer
    #[error("Tracker API error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),
}

impl WorkerError {
    /// Returns true if retrying this job can never succeed
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            WorkerError::MissingSettings(_) | WorkerError::InvalidPayload(_)
        )
    }
}
