//! Lifecycle event names and the DOM-level namespace.
//!
//! Single source of truth for the names local handlers subscribe to and the
//! namespaced names rebroadcast on the element channel.

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

pub const EVENT_NAMESPACE: &str = "live-partial";

// ---------------------------------------------------------------------------
// Lifecycle events (in firing order)
// ---------------------------------------------------------------------------

pub const EVENT_INITIALIZED: &str = "initialized";
pub const EVENT_STATE_CHANGE: &str = "stateChange";
pub const EVENT_BEFORE_DEBOUNCE: &str = "beforeDebounce";
pub const EVENT_BEFORE_UPDATE: &str = "beforeUpdate";
pub const EVENT_BEFORE_RENDER: &str = "beforeRender";
pub const EVENT_AFTER_RENDER: &str = "afterRender";
pub const EVENT_ERROR: &str = "error";

/// Every lifecycle event the sync engine itself emits.
pub const LIFECYCLE_EVENTS: &[&str] = &[
    EVENT_INITIALIZED,
    EVENT_STATE_CHANGE,
    EVENT_BEFORE_DEBOUNCE,
    EVENT_BEFORE_UPDATE,
    EVENT_BEFORE_RENDER,
    EVENT_AFTER_RENDER,
    EVENT_ERROR,
];

/// Name of the DOM-level event rebroadcast for a local event,
/// e.g. `stateChange` -> `live-partial:stateChange`.
pub fn dom_event_name(event: &str) -> String {
    format!("{EVENT_NAMESPACE}:{event}")
}
