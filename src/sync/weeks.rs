//! ISO-week bucketing for inference batches.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::db::TimesheetRecord;

use super::normalize::parse_instant;

/// ISO 8601 week key for an instant, e.g. `2025-W09`.
///
/// Uses the ISO week-numbering year, which differs from the calendar year
/// around January 1st.
pub fn week_key(at: DateTime<Utc>) -> String {
    let week = at.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Records that start in the same ISO week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBucket {
    pub id: String,
    pub entries: Vec<TimesheetRecord>,
}

/// Group records into week buckets, ordered by week id.
pub fn group_by_week(records: &[TimesheetRecord]) -> Vec<WeekBucket> {
    let mut buckets: BTreeMap<String, Vec<TimesheetRecord>> = BTreeMap::new();

    for record in records {
        let at = parse_instant(&record.begin_at).unwrap_or_else(Utc::now);
        buckets
            .entry(week_key(at))
            .or_default()
            .push(record.clone());
    }

    buckets
        .into_iter()
        .map(|(id, entries)| WeekBucket { id, entries })
        .collect()
}
