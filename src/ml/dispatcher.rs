//! Batch dispatch to the inference service.

use std::sync::Arc;

use crate::db::{ml_results, Store, TimesheetRecord};
use crate::sync::weeks::WeekBucket;

use super::{InferenceError, InferenceProvider, InferenceRequest, SanitizedSettings};

/// Sends batches to the inference provider and records what comes back.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
    provider: Arc<dyn InferenceProvider>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>, provider: Arc<dyn InferenceProvider>) -> Self {
        Self { store, provider }
    }

    /// Send one batch and persist the result.
    ///
    /// An RPC failure propagates so the caller decides what a failed
    /// dispatch means for its job. A persistence failure after a successful
    /// call is only logged: the inference already happened and the batch
    /// will be re-dispatched by a later sync anyway.
    pub async fn dispatch(
        &self,
        user_id: &str,
        kind: &str,
        timesheets: Vec<TimesheetRecord>,
        weeks: Vec<WeekBucket>,
        settings: Option<SanitizedSettings>,
    ) -> Result<(), InferenceError> {
        let request = InferenceRequest {
            user_id: user_id.to_string(),
            timesheets,
            weeks,
            settings,
            options: None,
            kind: kind.to_string(),
        };

        log::debug!(
            "dispatching {} batch for {}: {} record(s), {} week(s)",
            request.kind,
            request.user_id,
            request.timesheets.len(),
            request.weeks.len()
        );

        let result = self.provider.infer(&request).await?;

        let stored = self
            .store
            .with_conn(|conn| ml_results::append_result(conn, user_id, kind, &result));
        if let Err(e) = stored {
            log::warn!("failed to persist {} result for {}: {}", kind, user_id, e);
        }

        Ok(())
    }
}

/// Captures requests; answers with a canned result or a scripted error.
#[cfg(test)]
pub(crate) struct FakeProvider {
    pub(crate) requests: parking_lot::Mutex<Vec<InferenceRequest>>,
    fail: bool,
}

#[cfg(test)]
impl FakeProvider {
    pub(crate) fn answering() -> Self {
        Self {
            requests: parking_lot::Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            requests: parking_lot::Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl InferenceProvider for FakeProvider {
    async fn infer(
        &self,
        request: &InferenceRequest,
    ) -> Result<serde_json::Value, InferenceError> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(InferenceError::Api {
                status: 500,
                message: "scripted".to_string(),
            });
        }
        Ok(serde_json::json!({"score": 1.0}))
    }
}
