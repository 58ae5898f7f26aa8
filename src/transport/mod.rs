//! Outgoing sync requests.
//!
//! The engine talks to the server through [`Transport`], a fetch-like
//! collaborator. [`HttpTransport`] is the reqwest-backed implementation.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::state::StateMap;
use crate::sync::SyncError;

pub use http::HttpTransport;

/// Reserved body key carrying the logical partial name.
pub const PARTIAL_NAME_KEY: &str = "_live_partial_name";

/// One POST to `/{controller-path}/{action-method}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    /// Endpoint path, always starting with `/`.
    pub path: String,
    pub body: StateMap,
    pub csrf_token: Option<String>,
}

/// A resolved response. Any status counts as renderable markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl SyncResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and read the whole body as text.
    async fn post(&self, request: SyncRequest) -> Result<SyncResponse, SyncError>;
}
