//! Shared helpers for HTTP-level tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use live_partial::dom::memory::{MemoryDocument, MemoryElement};
use live_partial::dom::{
    ATTR_ACTION_METHOD, ATTR_CONTROLLER_PATH, ATTR_MARKER, ATTR_PARTIAL_NAME, ATTR_STATE,
};
use live_partial::{HttpTransport, LivePartialConfig, PartialRegistry};

pub const CSRF_TOKEN: &str = "integration-token";

pub fn config_for(base_url: String) -> LivePartialConfig {
    LivePartialConfig {
        base_url,
        ..LivePartialConfig::default()
    }
}

/// A page with one counter partial, discovered against `config`.
pub fn counter_page(
    config: LivePartialConfig,
    initial_html: &str,
) -> (PartialRegistry, Arc<MemoryElement>) {
    counter_page_with_token(config, initial_html, Some(CSRF_TOKEN))
}

pub fn counter_page_with_token(
    config: LivePartialConfig,
    initial_html: &str,
    csrf_token: Option<&str>,
) -> (PartialRegistry, Arc<MemoryElement>) {
    let element = MemoryElement::builder()
        .attribute(ATTR_MARKER, "")
        .attribute(ATTR_PARTIAL_NAME, "shared/counter")
        .attribute(ATTR_CONTROLLER_PATH, "counters")
        .attribute(ATTR_ACTION_METHOD, "update")
        .attribute(ATTR_STATE, r#"{"count":0}"#)
        .inner_html(initial_html)
        .build();
    let document = match csrf_token {
        Some(token) => MemoryDocument::with_csrf_token(token),
        None => MemoryDocument::new(),
    };
    document.append(element.clone());

    let transport = HttpTransport::new(&config).expect("http transport builds");
    let registry = PartialRegistry::discover(Arc::new(document), Arc::new(transport), config)
        .expect("registry builds");
    (registry, element)
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
