//! Service configuration stored in ~/.timebeam/config.json.
//!
//! Every field carries a serde default so a missing or partial file still
//! yields a working config. The file is optional; first run works without it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Base URL of the inference service (`POST {base}/infer`).
    #[serde(default = "default_inference_url")]
    pub inference_url: String,
    /// IANA timezone the cron cadences are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Daily sweep: 7-day window, fires shortly after midnight.
    #[serde(default = "default_daily_cron")]
    pub daily_cron: String,
    /// Frequent sweep: 24-hour window, fires every quarter hour.
    #[serde(default = "default_frequent_cron")]
    pub frequent_cron: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Total executions a queued job gets before it is dead-lettered.
    #[serde(default = "default_max_job_attempts")]
    pub max_job_attempts: u32,
}

fn default_database_path() -> String {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".timebeam")
        .join("timebeam.db")
        .to_string_lossy()
        .to_string()
}

fn default_inference_url() -> String {
    "http://localhost:50051".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_daily_cron() -> String {
    "5 0 * * *".to_string()
}

fn default_frequent_cron() -> String {
    "*/15 * * * *".to_string()
}

fn default_http_timeout_secs() -> u64 {
    20
}

fn default_max_job_attempts() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            inference_url: default_inference_url(),
            timezone: default_timezone(),
            daily_cron: default_daily_cron(),
            frequent_cron: default_frequent_cron(),
            http_timeout_secs: default_http_timeout_secs(),
            max_job_attempts: default_max_job_attempts(),
        }
    }
}

/// Canonical config file location.
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".timebeam").join("config.json"))
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.daily_cron, "5 0 * * *");
        assert_eq!(config.frequent_cron, "*/15 * * * *");
        assert_eq!(config.max_job_attempts, 3);
    }

    #[test]
    fn partial_file_fills_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"inferenceUrl": "http://ml.internal:9000", "timezone": "Europe/Berlin"}"#)
            .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.inference_url, "http://ml.internal:9000");
        assert_eq!(config.timezone, "Europe/Berlin");
        assert_eq!(config.http_timeout_secs, 20);
        assert!(config.database_path.ends_with("timebeam.db"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"));
    }
}
