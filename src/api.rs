//! Programmatic trigger and status surface.
//!
//! The settings layer calls these when a user connects a tracker or asks
//! for a fresh analytics pass. Triggers only mark state and enqueue; the
//! lane workers do the actual work later.

use crate::db::{self, DbError, Store, SyncStatus};
use crate::queue::{AnalyticsParams, JobPayload, Lane, Queue};

/// Start a full backfill for a user. Marks them syncing and enqueues an
/// initial-sync job; returns the job id.
pub fn trigger_initial_sync(
    store: &Store,
    queue: &Queue,
    user_id: &str,
) -> Result<String, DbError> {
    store.with_conn(|conn| db::sync_state::set_status(conn, user_id, SyncStatus::Syncing))?;

    let job_id = queue.enqueue(
        Lane::Sync,
        &JobPayload::InitialSync {
            user_id: user_id.to_string(),
        },
    )?;

    log::info!("initial sync queued for {} (job {})", user_id, job_id);
    Ok(job_id)
}

/// Enqueue an analytics run; returns the job id.
pub fn trigger_analytics(
    queue: &Queue,
    user_id: &str,
    params: Option<AnalyticsParams>,
) -> Result<String, DbError> {
    let job_id = queue.enqueue(
        Lane::Analytics,
        &JobPayload::AnalyticsRun {
            user_id: user_id.to_string(),
            params,
        },
    )?;

    log::info!("analytics run queued for {} (job {})", user_id, job_id);
    Ok(job_id)
}

/// Current sync status for a user. Users without a row are `idle`.
pub fn sync_status(store: &Store, user_id: &str) -> Result<SyncStatus, DbError> {
    store.with_conn(|conn| db::sync_state::get_status(conn, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn setup() -> (Arc<Store>, Queue) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let queue = Queue::new(store.clone(), 3);
        (store, queue)
    }

    #[test]
    fn initial_sync_trigger_marks_syncing_and_enqueues() {
        let (store, queue) = setup();

        let job_id = trigger_initial_sync(&store, &queue, "u1").unwrap();

        assert_eq!(sync_status(&store, "u1").unwrap(), SyncStatus::Syncing);
        store.with_conn(|conn| {
            let (lane, kind): (String, String) = conn
                .query_row(
                    "SELECT lane, kind FROM jobs WHERE id = ?1",
                    rusqlite::params![job_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .unwrap();
            assert_eq!(lane, "sync");
            assert_eq!(kind, "initial-sync");
        });
    }

    #[test]
    fn analytics_trigger_lands_on_the_analytics_lane() {
        let (store, queue) = setup();

        let job_id = trigger_analytics(&queue, "u1", None).unwrap();

        // Analytics triggers don't touch sync state
        assert_eq!(sync_status(&store, "u1").unwrap(), SyncStatus::Idle);
        store.with_conn(|conn| {
            let lane: String = conn
                .query_row(
                    "SELECT lane FROM jobs WHERE id = ?1",
                    rusqlite::params![job_id],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(lane, "analytics");
        });
    }

    #[test]
    fn unknown_user_reads_as_idle() {
        let (store, _queue) = setup();
        assert_eq!(sync_status(&store, "nobody").unwrap(), SyncStatus::Idle);
    }
}
