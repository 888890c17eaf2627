//! Inference service integration.
//!
//! Batches of synced timesheets go out to the inference service over HTTP
//! and whatever it returns is stored verbatim in `ml_results`. The provider
//! sits behind a trait so workers can be tested without a live service.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{TimesheetRecord, UserSettings};
use crate::sync::weeks::WeekBucket;

pub mod client;
pub mod dispatcher;

pub use client::{HttpInference, InferenceError, InferenceProvider};
pub use dispatcher::Dispatcher;

/// User settings as the inference service sees them.
///
/// This is the only settings projection that crosses the process boundary.
/// The tracker URL and credential stay out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedSettings {
    pub project_settings: Option<serde_json::Value>,
    pub excluded_tags: Vec<String>,
    pub user_preferences: Option<serde_json::Value>,
}

impl From<&UserSettings> for SanitizedSettings {
    fn from(settings: &UserSettings) -> Self {
        Self {
            project_settings: settings.project_settings.clone(),
            excluded_tags: settings.excluded_tags.clone(),
            user_preferences: settings.user_preferences.clone(),
        }
    }
}

/// One inference call: a batch of records plus their week grouping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub user_id: String,
    pub timesheets: Vec<TimesheetRecord>,
    pub weeks: Vec<WeekBucket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SanitizedSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_settings_drop_the_credential() {
        let settings = UserSettings {
            user_id: "u1".to_string(),
            tracker_url: "https://tracker.example".to_string(),
            tracker_api_key: "super-secret".to_string(),
            project_settings: Some(serde_json::json!({"7": {"billable": true}})),
            excluded_tags: vec!["internal".to_string()],
            user_preferences: None,
        };

        let sanitized = SanitizedSettings::from(&settings);
        let json = serde_json::to_string(&sanitized).unwrap();

        assert!(json.contains("projectSettings"));
        assert!(json.contains("excludedTags"));
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("tracker.example"));
    }

    #[test]
    fn request_omits_absent_settings_and_options() {
        let request = InferenceRequest {
            user_id: "u1".to_string(),
            timesheets: Vec::new(),
            weeks: Vec::new(),
            settings: None,
            options: None,
            kind: "analytics".to_string(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("settings"));
        assert!(!json.contains("options"));
        assert!(json.contains("\"kind\":\"analytics\""));
    }
}
