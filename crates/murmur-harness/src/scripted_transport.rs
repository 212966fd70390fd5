//! Scripted [`Transport`] for tests.
//!
//! Responses are queued up front and handed out in order; every request is
//! recorded for later assertions. An exhausted script answers with a
//! transport error so a missing expectation fails loudly.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use murmur_client::{ApiRequest, ApiResponse, Message, Transport, TransportError};

/// Transport answering from a queue of canned responses.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    responses: VecDeque<Result<ApiResponse, TransportError>>,
    requests: Vec<ApiRequest>,
}

impl ScriptedTransport {
    /// Create a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response.
    pub fn push_response(&self, response: ApiResponse) {
        self.lock().responses.push_back(Ok(response));
    }

    /// Queue a `200 OK` JSON response.
    pub fn push_json(&self, value: serde_json::Value) {
        self.push_response(ApiResponse::json(&value));
    }

    /// Queue a history page holding `messages` in the given (newest-first)
    /// order.
    pub fn push_page(&self, messages: &[Message]) {
        self.push_json(serde_json::json!({ "messages": messages }));
    }

    /// Queue an empty-bodied response with `status`.
    pub fn push_status(&self, status: u16) {
        self.push_response(ApiResponse::new(status, Vec::new()));
    }

    /// Queue a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.lock().responses.push_back(Err(error));
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    /// Most recent request. `None` if nothing was sent.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.lock().requests.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut inner = self.lock();
        tracing::trace!(path = %request.path, "scripted transport request");
        inner.requests.push(request);
        inner
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no scripted response".to_owned())))
    }
}
