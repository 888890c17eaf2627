//! Typed client over the tracker's list endpoints.
//!
//! One client per user, built from that user's stored settings. Endpoint
//! views ([`TrackerClient::timesheets`] etc.) all share the same page/size
//! mechanics through [`PageSource`]; only path and fixed params differ.

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use super::paginate::PageSource;
use super::types::{RawActivity, RawProject, RawTimesheet};
use super::{fetch_with_retry, RetryPolicy, TrackerError, AUTH_HEADER};

pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl TrackerClient {
    /// Build a client for one user's tracker instance.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, TrackerError> {
        let trimmed = base_url.trim_end_matches('/');
        url::Url::parse(trimmed)
            .map_err(|e| TrackerError::InvalidUrl(base_url.to_string(), e.to_string()))?;

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: trimmed.to_string(),
            api_key: api_key.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// One page GET with bounded retry. `page` is 1-based.
    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        page: u32,
        size: u32,
    ) -> Result<Vec<T>, TrackerError> {
        fetch_with_retry(&self.retry, || self.request_page(path, params, page, size)).await
    }

    async fn request_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        page: u32,
        size: u32,
    ) -> Result<Vec<T>, TrackerError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .header(AUTH_HEADER, &self.api_key)
            .query(params)
            .query(&[("page", page.to_string()), ("size", size.to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let message = response.text().await.unwrap_or_default();
            return Err(TrackerError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        Ok(response.json().await?)
    }

    /// Timesheets whose begin time falls within `[begin, end]`.
    pub fn timesheets(
        &self,
        begin: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> EndpointPages<'_, RawTimesheet> {
        EndpointPages::new(
            self,
            "/api/timesheets",
            vec![
                ("begin".to_string(), begin.to_rfc3339()),
                ("end".to_string(), end.to_rfc3339()),
            ],
        )
    }

    pub fn projects(&self) -> EndpointPages<'_, RawProject> {
        EndpointPages::new(self, "/api/projects", Vec::new())
    }

    pub fn activities(&self) -> EndpointPages<'_, RawActivity> {
        EndpointPages::new(self, "/api/activities", Vec::new())
    }

    /// Tag names; the tracker returns plain strings here.
    pub fn tags(&self) -> EndpointPages<'_, String> {
        EndpointPages::new(self, "/api/tags", Vec::new())
    }
}

/// A page-source view over one endpoint of one client.
pub struct EndpointPages<'a, T> {
    client: &'a TrackerClient,
    path: &'static str,
    params: Vec<(String, String)>,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> EndpointPages<'a, T> {
    fn new(client: &'a TrackerClient, path: &'static str, params: Vec<(String, String)>) -> Self {
        Self {
            client,
            path,
            params,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PageSource for EndpointPages<'_, T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;

    async fn fetch_page(&self, page: u32, size: u32) -> Result<Vec<T>, TrackerError> {
        self.client
            .get_page(self.path, &self.params, page, size)
            .await
    }
}
