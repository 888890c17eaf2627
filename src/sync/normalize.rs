//! Wire row to storage row conversion.

use chrono::{DateTime, Utc};

use crate::db::TimesheetRecord;
use crate::tracker::RawTimesheet;

/// Parse an RFC 3339 timestamp into UTC. Returns `None` for anything the
/// tracker sent that doesn't parse.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert a raw tracker row into a storage record for `user_id`.
///
/// Trackers disagree on which fields they populate, so every gap has a
/// fallback: a missing or unparseable start time becomes "now", the comment
/// wins over the description, and absent tags become an empty list. Rows are
/// never dropped here.
pub fn normalize(user_id: &str, raw: RawTimesheet) -> TimesheetRecord {
    let begin_at = raw
        .begin
        .as_deref()
        .and_then(parse_instant)
        .unwrap_or_else(Utc::now)
        .to_rfc3339();
    let end_at = raw
        .end
        .as_deref()
        .and_then(parse_instant)
        .map(|dt| dt.to_rfc3339());

    TimesheetRecord {
        user_id: user_id.to_string(),
        external_id: raw.id,
        begin_at,
        end_at,
        duration_secs: raw.duration,
        project_id: raw.project.as_ref().map(|p| p.id),
        project_name: raw.project.and_then(|p| p.name),
        activity_id: raw.activity.as_ref().map(|a| a.id),
        activity_name: raw.activity.and_then(|a| a.name),
        description: raw.comment.or(raw.description),
        tags: raw.tags.unwrap_or_default(),
        meta: raw.meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::RawRef;

    fn raw(id: i64) -> RawTimesheet {
        RawTimesheet {
            id,
            begin: None,
            end: None,
            duration: None,
            project: None,
            activity: None,
            comment: None,
            description: None,
            tags: None,
            meta: None,
        }
    }

    #[test]
    fn full_row_maps_every_field() {
        let record = normalize(
            "u1",
            RawTimesheet {
                id: 42,
                begin: Some("2025-03-01T09:00:00+01:00".to_string()),
                end: Some("2025-03-01T10:30:00+01:00".to_string()),
                duration: Some(5400),
                project: Some(RawRef {
                    id: 7,
                    name: Some("Website".to_string()),
                }),
                activity: Some(RawRef {
                    id: 3,
                    name: Some("Development".to_string()),
                }),
                comment: Some("fix login".to_string()),
                description: Some("longer text".to_string()),
                tags: Some(vec!["billable".to_string()]),
                meta: Some(serde_json::json!({"exported": true})),
            },
        );

        assert_eq!(record.user_id, "u1");
        assert_eq!(record.external_id, 42);
        // Offsets are converted to UTC
        assert_eq!(record.begin_at, "2025-03-01T08:00:00+00:00");
        assert_eq!(record.end_at.as_deref(), Some("2025-03-01T09:30:00+00:00"));
        assert_eq!(record.duration_secs, Some(5400));
        assert_eq!(record.project_id, Some(7));
        assert_eq!(record.project_name.as_deref(), Some("Website"));
        assert_eq!(record.activity_id, Some(3));
        assert_eq!(record.activity_name.as_deref(), Some("Development"));
        assert_eq!(record.description.as_deref(), Some("fix login"));
        assert_eq!(record.tags, vec!["billable".to_string()]);
        assert_eq!(record.meta, Some(serde_json::json!({"exported": true})));
    }

    #[test]
    fn missing_begin_falls_back_to_now() {
        let before = Utc::now();
        let record = normalize("u1", raw(1));
        let begin = parse_instant(&record.begin_at).unwrap();
        assert!(begin >= before && begin <= Utc::now());
    }

    #[test]
    fn unparseable_begin_falls_back_to_now() {
        let mut r = raw(1);
        r.begin = Some("yesterday-ish".to_string());
        let before = Utc::now();
        let record = normalize("u1", r);
        let begin = parse_instant(&record.begin_at).unwrap();
        assert!(begin >= before && begin <= Utc::now());
    }

    #[test]
    fn description_falls_back_when_comment_absent() {
        let mut r = raw(1);
        r.description = Some("from description".to_string());
        let record = normalize("u1", r);
        assert_eq!(record.description.as_deref(), Some("from description"));
    }

    #[test]
    fn sparse_row_gets_empty_defaults() {
        let record = normalize("u1", raw(9));
        assert_eq!(record.end_at, None);
        assert_eq!(record.duration_secs, None);
        assert_eq!(record.project_id, None);
        assert_eq!(record.activity_name, None);
        assert_eq!(record.description, None);
        assert!(record.tags.is_empty());
        assert_eq!(record.meta, None);
    }
}
