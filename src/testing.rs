//! Shared fixtures for in-crate tests: a scripted transport and helpers for
//! building instances and recording their lifecycle.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::bus::event_types::LIFECYCLE_EVENTS;
use crate::config::LivePartialConfig;
use crate::dom::memory::MemoryDocument;
use crate::sync::{LivePartial, PartialContext, SyncError};
use crate::transport::{SyncRequest, SyncResponse, Transport};

pub const TEST_CSRF_TOKEN: &str = "csrf-test-token";

/// What the scripted transport answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Html(String),
    Status(u16, String),
    Fail(String),
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn html(body: &str) -> Self {
        Self::Html(body.to_string())
    }

    pub fn delayed(ms: u64, reply: Reply) -> Self {
        Self::Delayed(Duration::from_millis(ms), Box::new(reply))
    }
}

/// Transport that records every request and answers from a script.
/// With an empty script it answers `<div>ok</div>`.
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<SyncRequest>>,
    script: Mutex<VecDeque<Reply>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, reply: Reply) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<SyncRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post(&self, request: SyncRequest) -> Result<SyncResponse, SyncError> {
        let url = format!("http://test.local{}", request.path);
        self.requests.lock().unwrap().push(request);
        let mut reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::html("<div>ok</div>"));

        loop {
            match reply {
                Reply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                Reply::Html(body) => return Ok(SyncResponse { status: 200, url, body }),
                Reply::Status(status, body) => return Ok(SyncResponse { status, url, body }),
                Reply::Fail(message) => return Err(SyncError::Request(message)),
            }
        }
    }
}

pub fn context(transport: Arc<RecordingTransport>, config: LivePartialConfig) -> PartialContext {
    PartialContext {
        document: Arc::new(MemoryDocument::with_csrf_token(TEST_CSRF_TOKEN)),
        transport,
        config,
        runtime: Handle::current(),
        document_events: None,
    }
}

/// Record the name of every lifecycle event `partial` emits from now on.
pub fn record_events(partial: &LivePartial) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in LIFECYCLE_EVENTS {
        let sink = log.clone();
        let _ = partial.on(*event, move |n| sink.lock().unwrap().push(n.event.clone()));
    }
    log
}
