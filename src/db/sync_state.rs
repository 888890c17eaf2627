//! Per-user sync status rows.

use chrono::Utc;
use rusqlite::{params, Connection};

use super::types::{DbError, SyncStatus};

/// Upsert the user's sync status.
pub fn set_status(conn: &Connection, user_id: &str, status: SyncStatus) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO sync_state (user_id, status, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
             status = excluded.status,
             updated_at = excluded.updated_at",
        params![user_id, status.as_str(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Current status for a user. Users without a row are `idle`.
pub fn get_status(conn: &Connection, user_id: &str) -> Result<SyncStatus, DbError> {
    let mut stmt = conn.prepare("SELECT status FROM sync_state WHERE user_id = ?1")?;
    let mut rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

    match rows.next() {
        Some(row) => Ok(SyncStatus::parse(&row?).unwrap_or(SyncStatus::Idle)),
        None => Ok(SyncStatus::Idle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    #[test]
    fn absent_row_reads_as_idle() {
        let store = Store::open_in_memory().unwrap();
        let status = store.with_conn(|conn| get_status(conn, "u1")).unwrap();
        assert_eq!(status, SyncStatus::Idle);
    }

    #[test]
    fn set_status_upserts() {
        let store = Store::open_in_memory().unwrap();

        store
            .with_conn(|conn| set_status(conn, "u1", SyncStatus::Syncing))
            .unwrap();
        assert_eq!(
            store.with_conn(|conn| get_status(conn, "u1")).unwrap(),
            SyncStatus::Syncing
        );

        store
            .with_conn(|conn| set_status(conn, "u1", SyncStatus::Synced))
            .unwrap();
        assert_eq!(
            store.with_conn(|conn| get_status(conn, "u1")).unwrap(),
            SyncStatus::Synced
        );

        // Still exactly one row after two writes
        let count: i64 = store.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM sync_state", [], |row| row.get(0))
                .unwrap()
        });
        assert_eq!(count, 1);
    }
}
