//! Wire shapes for tracker list endpoints.
//!
//! Everything beyond the row id is optional; normalization
//! (`sync::normalize`) applies the fallback chain. Unknown fields are
//! ignored, absent fields deserialize to `None`.

use serde::Deserialize;

/// One timesheet row as the tracker sends it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTimesheet {
    pub id: i64,
    #[serde(default)]
    pub begin: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    /// Duration in seconds, when the tracker has one.
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub project: Option<RawRef>,
    #[serde(default)]
    pub activity: Option<RawRef>,
    /// Primary free-text field; wins over `description`.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// A nested `{id, name}` reference (project or activity).
#[derive(Debug, Clone, Deserialize)]
pub struct RawRef {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// One project row from `/api/projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProject {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
}

/// One activity row from `/api/activities`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawActivity {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub project: Option<i64>,
}
