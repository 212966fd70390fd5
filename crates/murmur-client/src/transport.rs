//! Transport abstraction.
//!
//! The [`Transport`] trait decouples [`crate::ApiClient`] from any specific
//! HTTP implementation. Requests carry a path relative to the API base; the
//! transport owns the base URL.

use std::future::Future;

use crate::TransportError;

/// Outbound `GET` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// Extra headers in order.
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    /// `GET` request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self { path: path.into(), query: Vec::new(), headers: Vec::new() }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_owned(), value.to_string()));
        self
    }

    /// Set a header, replacing any previous value for `name`.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
    }

    /// Value of header `name`. `None` if not set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Value of query parameter `name`. `None` if not set.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }
}

/// Raw API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Response with the given status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    /// `200 OK` response carrying `value` as JSON.
    pub fn json(value: &serde_json::Value) -> Self {
        Self { status: 200, body: value.to_string().into_bytes() }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Async request/response I/O.
///
/// # Implementations
///
/// - **Production**: [`crate::http::HttpTransport`] (reqwest)
/// - **Tests**: scripted transports returning canned responses
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response.
    ///
    /// Non-success statuses are not errors at this layer; only failures to
    /// obtain a response are.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be sent or timed out.
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}
