//! Read access to the `user_settings` table.
//!
//! Settings rows are written by the account surface; this service only ever
//! reads them. The JSON columns are parsed leniently: a malformed value
//! degrades to empty/absent rather than failing the whole sync.

use rusqlite::{params, Connection, Row};

use super::types::{DbError, UserSettings};

fn map_settings_row(row: &Row) -> rusqlite::Result<UserSettings> {
    let project_settings: Option<String> = row.get(3)?;
    let excluded_tags: String = row.get(4)?;
    let user_preferences: Option<String> = row.get(5)?;

    Ok(UserSettings {
        user_id: row.get(0)?,
        tracker_url: row.get(1)?,
        tracker_api_key: row.get(2)?,
        project_settings: project_settings.and_then(|s| serde_json::from_str(&s).ok()),
        excluded_tags: serde_json::from_str(&excluded_tags).unwrap_or_default(),
        user_preferences: user_preferences.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

/// Fetch one user's settings, or `None` when no row exists.
pub fn get_user_settings(conn: &Connection, user_id: &str) -> Result<Option<UserSettings>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, tracker_url, tracker_api_key, project_settings,
                excluded_tags, user_preferences
         FROM user_settings
         WHERE user_id = ?1",
    )?;

    let mut rows = stmt.query_map(params![user_id], map_settings_row)?;

    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

/// All user ids with a settings row, in stable order. The scheduler fans out
/// over exactly this set.
pub fn list_user_ids(conn: &Connection) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare("SELECT user_id FROM user_settings ORDER BY user_id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

#[cfg(test)]
pub(crate) fn insert_test_settings(conn: &Connection, user_id: &str, url: &str, key: &str) {
    conn.execute(
        "INSERT INTO user_settings
            (user_id, tracker_url, tracker_api_key, project_settings, excluded_tags, user_preferences)
         VALUES (?1, ?2, ?3, '{\"billable\":true}', '[\"internal\"]', '{\"locale\":\"de\"}')",
        params![user_id, url, key],
    )
    .expect("insert settings fixture");
}
