//! Authenticated API client.
//!
//! [`ApiClient`] wraps a [`Transport`] with the two rules every outbound call
//! shares: attach the bearer credential when one is set, and surface HTTP 401
//! as [`ApiError::Unauthorized`] so the caller can force a logout.

use serde::de::DeserializeOwned;

use crate::{
    ApiError, ApiRequest, ApiResponse, Conversation, ConversationPage, GroupDetails, GroupId,
    Transport, UserId, UserSummary,
};

/// Name of the header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// Status the server uses for a missing, expired, or invalid credential.
const STATUS_UNAUTHORIZED: u16 = 401;

/// Request for one page of conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Conversation to page through.
    pub conversation: Conversation,
    /// Logged-in user; the other side of a direct conversation.
    pub viewer: UserId,
    /// 1-based page number.
    pub page: u32,
    /// Messages per page.
    pub page_size: u32,
}

impl PageRequest {
    /// Build the API request for this page.
    pub fn to_request(&self) -> Result<ApiRequest, ApiError> {
        if self.page == 0 || self.page_size == 0 {
            return Err(ApiError::InvalidRequest(format!(
                "page {} / page size {} must be positive",
                self.page, self.page_size
            )));
        }

        let request = match &self.conversation {
            Conversation::Direct(peer) => {
                if peer.is_empty() || self.viewer.is_empty() {
                    return Err(ApiError::InvalidRequest("direct conversation id is empty".into()));
                }
                ApiRequest::get("/messages").query("user1", &self.viewer).query("user2", peer)
            },
            Conversation::Group(group) => ApiRequest::get(format!("{}/messages", group_path(group)?)),
        };

        Ok(request.query("page", self.page).query("pageSize", self.page_size))
    }
}

/// API client with bearer credential handling.
#[derive(Debug)]
pub struct ApiClient<T: Transport> {
    transport: T,
    bearer: Option<String>,
}

impl<T: Transport> ApiClient<T> {
    /// Create a client with no credential.
    pub fn new(transport: T) -> Self {
        Self { transport, bearer: None }
    }

    /// Set or clear the bearer credential attached to every request.
    pub fn set_bearer(&mut self, token: Option<String>) {
        self.bearer = token;
    }

    /// Current bearer credential. `None` if logged out.
    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// Send a request through the interceptor chain.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Unauthorized`] on HTTP 401
    /// - [`ApiError::Status`] on any other non-2xx status
    /// - [`ApiError::Transport`] if no response was obtained
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if let Some(token) = &self.bearer {
            request.set_header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let path = request.path.clone();
        let response = self.transport.send(request).await?;

        if response.status == STATUS_UNAUTHORIZED {
            tracing::warn!(%path, "request rejected as unauthorized");
            return Err(ApiError::Unauthorized);
        }

        if !response.is_success() {
            return Err(status_error(&response));
        }

        Ok(response)
    }

    /// Send a request and decode the JSON body.
    pub async fn get_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let response = self.send(request).await?;
        serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch one page of history, newest message first.
    pub async fn conversation_page(
        &self,
        request: &PageRequest,
    ) -> Result<ConversationPage, ApiError> {
        self.get_json(request.to_request()?).await
    }

    /// Fetch the current members of a group.
    pub async fn group_members(&self, group: &GroupId) -> Result<Vec<UserSummary>, ApiError> {
        let details: GroupDetails = self.get_json(ApiRequest::get(group_path(group)?)).await?;
        Ok(details.users)
    }
}

fn group_path(group: &GroupId) -> Result<String, ApiError> {
    if group.is_empty() || group.as_str().contains('/') {
        return Err(ApiError::InvalidRequest(format!("invalid group id {group:?}")));
    }
    Ok(format!("/groups/{group}"))
}

fn status_error(response: &ApiResponse) -> ApiError {
    let body = String::from_utf8_lossy(&response.body).trim().to_owned();
    let body = if body.is_empty() { "<empty>".to_owned() } else { body };
    ApiError::Status { status: response.status, body }
}
