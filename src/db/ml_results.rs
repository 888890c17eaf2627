//! Append-only inference result log.
//!
//! Rows are never updated or deleted; each dispatch appends one result keyed
//! by the kind that triggered it ("sync" or "analytics").

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::types::{DbError, MlResult};

fn map_result_row(row: &Row) -> rusqlite::Result<MlResult> {
    let payload: String = row.get(3)?;
    Ok(MlResult {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        created_at: row.get(4)?,
    })
}

/// Append one result row, returning its id.
pub fn append_result(
    conn: &Connection,
    user_id: &str,
    kind: &str,
    payload: &serde_json::Value,
) -> Result<i64, DbError> {
    conn.execute(
        "INSERT INTO ml_results (user_id, kind, payload, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            user_id,
            kind,
            serde_json::to_string(payload)?,
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// A user's results, newest first.
pub fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<MlResult>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, payload, created_at
         FROM ml_results
         WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map(params![user_id], map_result_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}
