//! Mirrored timesheet rows.
//!
//! The tracker is the source of truth; the upsert is last-write-wins on
//! `(user_id, external_id)` so re-syncing an overlapping window converges to
//! the same rows instead of duplicating them.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::types::{DbError, TimesheetRecord};

fn map_timesheet_row(row: &Row) -> rusqlite::Result<TimesheetRecord> {
    let tags: String = row.get(10)?;
    let meta: Option<String> = row.get(11)?;

    Ok(TimesheetRecord {
        user_id: row.get(0)?,
        external_id: row.get(1)?,
        begin_at: row.get(2)?,
        end_at: row.get(3)?,
        duration_secs: row.get(4)?,
        project_id: row.get(5)?,
        project_name: row.get(6)?,
        activity_id: row.get(7)?,
        activity_name: row.get(8)?,
        description: row.get(9)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        meta: meta.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Insert or update one mirrored timesheet.
pub fn upsert_timesheet(conn: &Connection, rec: &TimesheetRecord) -> Result<(), DbError> {
    let tags = serde_json::to_string(&rec.tags)?;
    let meta = rec
        .meta
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO timesheets
            (user_id, external_id, begin_at, end_at, duration_secs, project_id,
             project_name, activity_id, activity_name, description, tags, meta, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(user_id, external_id) DO UPDATE SET
             begin_at = excluded.begin_at,
             end_at = excluded.end_at,
             duration_secs = excluded.duration_secs,
             project_id = excluded.project_id,
             project_name = excluded.project_name,
             activity_id = excluded.activity_id,
             activity_name = excluded.activity_name,
             description = excluded.description,
             tags = excluded.tags,
             meta = excluded.meta,
             updated_at = excluded.updated_at",
        params![
            rec.user_id,
            rec.external_id,
            rec.begin_at,
            rec.end_at,
            rec.duration_secs,
            rec.project_id,
            rec.project_name,
            rec.activity_id,
            rec.activity_name,
            rec.description,
            tags,
            meta,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// All of a user's rows whose begin time falls within `[since, until]`,
/// ordered by begin time. Timestamps are stored as canonical RFC 3339 UTC so
/// the comparison is lexicographic.
pub fn list_for_window(
    conn: &Connection,
    user_id: &str,
    since: &DateTime<Utc>,
    until: &DateTime<Utc>,
) -> Result<Vec<TimesheetRecord>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, external_id, begin_at, end_at, duration_secs, project_id,
                project_name, activity_id, activity_name, description, tags, meta
         FROM timesheets
         WHERE user_id = ?1 AND begin_at >= ?2 AND begin_at <= ?3
         ORDER BY begin_at ASC",
    )?;

    let rows = stmt.query_map(
        params![user_id, since.to_rfc3339(), until.to_rfc3339()],
        map_timesheet_row,
    )?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
pub(crate) fn test_record(user_id: &str, external_id: i64, begin_at: &str) -> TimesheetRecord {
    TimesheetRecord {
        user_id: user_id.to_string(),
        external_id,
        begin_at: begin_at.to_string(),
        end_at: None,
        duration_secs: Some(3600),
        project_id: Some(5),
        project_name: Some("Apollo".to_string()),
        activity_id: Some(9),
        activity_name: Some("Development".to_string()),
        description: Some("fix flaky pipeline".to_string()),
        tags: vec!["backend".to_string()],
        meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn count_rows(store: &Store) -> i64 {
        store.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM timesheets", [], |row| row.get(0))
                .unwrap()
        })
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let rec = test_record("u1", 42, "2025-03-10T09:00:00+00:00");

        store.with_conn(|conn| upsert_timesheet(conn, &rec)).unwrap();
        store.with_conn(|conn| upsert_timesheet(conn, &rec)).unwrap();

        assert_eq!(count_rows(&store), 1);
    }

    #[test]
    fn upsert_updates_fields_in_place() {
        let store = Store::open_in_memory().unwrap();
        let mut rec = test_record("u1", 42, "2025-03-10T09:00:00+00:00");
        store.with_conn(|conn| upsert_timesheet(conn, &rec)).unwrap();

        rec.description = Some("rewritten on the tracker".to_string());
        rec.duration_secs = Some(5400);
        store.with_conn(|conn| upsert_timesheet(conn, &rec)).unwrap();

        assert_eq!(count_rows(&store), 1);
        let since = "2025-03-01T00:00:00+00:00".parse().unwrap();
        let until = "2025-03-31T00:00:00+00:00".parse().unwrap();
        let rows = store
            .with_conn(|conn| list_for_window(conn, "u1", &since, &until))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description.as_deref(), Some("rewritten on the tracker"));
        assert_eq!(rows[0].duration_secs, Some(5400));
    }

    #[test]
    fn same_external_id_different_users_are_distinct_rows() {
        let store = Store::open_in_memory().unwrap();
        let a = test_record("u1", 42, "2025-03-10T09:00:00+00:00");
        let b = test_record("u2", 42, "2025-03-10T09:00:00+00:00");

        store.with_conn(|conn| upsert_timesheet(conn, &a)).unwrap();
        store.with_conn(|conn| upsert_timesheet(conn, &b)).unwrap();

        assert_eq!(count_rows(&store), 2);
    }

    #[test]
    fn window_query_filters_on_begin_time() {
        let store = Store::open_in_memory().unwrap();
        for (id, begin) in [
            (1, "2025-03-01T08:00:00+00:00"),
            (2, "2025-03-15T08:00:00+00:00"),
            (3, "2025-04-02T08:00:00+00:00"),
        ] {
            let rec = test_record("u1", id, begin);
            store.with_conn(|conn| upsert_timesheet(conn, &rec)).unwrap();
        }

        let since = "2025-03-10T00:00:00+00:00".parse().unwrap();
        let until = "2025-03-31T00:00:00+00:00".parse().unwrap();
        let rows = store
            .with_conn(|conn| list_for_window(conn, "u1", &since, &until))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].external_id, 2);
    }

    #[test]
    fn tags_and_meta_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let mut rec = test_record("u1", 7, "2025-03-10T09:00:00+00:00");
        rec.tags = vec!["billable".to_string(), "ops".to_string()];
        rec.meta = Some(serde_json::json!({"ticket": "OPS-221"}));

        store.with_conn(|conn| upsert_timesheet(conn, &rec)).unwrap();

        let since = "2025-03-01T00:00:00+00:00".parse().unwrap();
        let until = "2025-03-31T00:00:00+00:00".parse().unwrap();
        let rows = store
            .with_conn(|conn| list_for_window(conn, "u1", &since, &until))
            .unwrap();
        assert_eq!(rows[0].tags, rec.tags);
        assert_eq!(rows[0].meta, rec.meta);
    }
}
