//! Server-synchronized live partials.
//!
//! Binds page elements to a piece of reactive state: local mutations are
//! observed, debounced and POSTed to the server, and the rendered markup it
//! returns replaces the element's content.
//!
//! # Architecture
//!
//! - `bus`: named-event notification bus plus the DOM-level rebroadcast
//! - `debounce`: trailing-edge timer coalescing mutation bursts
//! - `state`: reactive key/value store with a post-commit hook
//! - `sync`: the per-element instance and its request/response lifecycle
//! - `registry`: discovery of bound elements and lookup by logical name
//! - `dom`, `transport`: boundary traits for the page and the HTTP client
//! - `config`: settings loaded from serde, the environment or a dotenv file

pub mod bus;
pub mod config;
pub mod debounce;
pub mod dom;
pub mod registry;
pub mod state;
pub mod sync;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bus::{
    DomEvent, DomListeners, DomReceiver, EventDetail, HandlerId, Notification, NotificationBus,
    Subscription,
};
pub use config::{ConfigError, LivePartialConfig};
pub use dom::{Document, DomError, Element};
pub use registry::{PartialRegistry, RegistryError};
pub use state::{ReactiveState, StateChange, StateMap};
pub use sync::{LivePartial, PartialContext, SyncError};
pub use transport::{HttpTransport, SyncRequest, SyncResponse, Transport, PARTIAL_NAME_KEY};

/// Install the fmt subscriber, honoring `RUST_LOG`. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "live_partial=debug,info".parse().expect("valid env filter")),
        )
        .try_init();
}
