//! HTTP client for the inference service.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::InferenceRequest;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("inference service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("inference result is not valid JSON: {0}")]
    BadResult(#[from] serde_json::Error),
}

/// Anything that can answer an inference request. Workers depend on this
/// rather than on the HTTP client directly.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: &InferenceRequest)
        -> Result<serde_json::Value, InferenceError>;
}

/// Wire shape of a successful inference response. The result comes back as
/// a JSON document encoded in a string field.
#[derive(Debug, Deserialize)]
struct InferResponse {
    #[serde(default)]
    result_json: String,
}

/// Decode the embedded result document. An absent or empty result counts as
/// an empty object, anything else must parse.
fn parse_result(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

pub struct HttpInference {
    http: reqwest::Client,
    url: String,
}

impl HttpInference {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: format!("{}/infer", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl InferenceProvider for HttpInference {
    async fn infer(
        &self,
        request: &InferenceRequest,
    ) -> Result<serde_json::Value, InferenceError> {
        let response = self.http.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: InferResponse = response.json().await?;
        Ok(parse_result(&body.result_json)?)
    }
}
