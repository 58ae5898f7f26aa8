use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::dom::Element;
use crate::state::StateMap;
use crate::sync::{LivePartial, SyncError};
use crate::transport::SyncResponse;

/// Event-specific part of a notification.
#[derive(Debug, Clone)]
pub enum EventDetail {
    Initialized,
    StateChange {
        prop: String,
        value: Value,
        /// `None` when the key did not exist before the assignment.
        old_value: Option<Value>,
    },
    BeforeDebounce {
        state: StateMap,
    },
    BeforeUpdate {
        state: StateMap,
    },
    BeforeRender {
        html: String,
        response: SyncResponse,
    },
    AfterRender {
        html: String,
        response: SyncResponse,
    },
    Error {
        error: Arc<SyncError>,
    },
    /// Payload of an event emitted by code outside the sync engine.
    Custom(Value),
}

impl EventDetail {
    /// JSON form of the detail, keyed the way page scripts read it.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Initialized => json!({}),
            Self::StateChange {
                prop,
                value,
                old_value,
            } => json!({
                "prop": prop,
                "value": value,
                "oldValue": old_value.clone().unwrap_or(Value::Null),
            }),
            Self::BeforeDebounce { state } | Self::BeforeUpdate { state } => {
                json!({ "state": state })
            }
            Self::BeforeRender { html, response } | Self::AfterRender { html, response } => {
                json!({ "html": html, "response": response })
            }
            Self::Error { error } => json!({ "error": error.to_string() }),
            Self::Custom(value) => value.clone(),
        }
    }
}

/// Who is emitting: stamped onto every notification a bus delivers.
#[derive(Clone)]
pub(crate) struct Origin {
    pub partial: Weak<LivePartial>,
    pub element: Arc<dyn Element>,
    pub partial_name: Option<String>,
}

/// A delivered event: the detail plus the owning instance, its element,
/// its logical name and the capture time.
#[derive(Clone)]
pub struct Notification {
    pub event: String,
    pub detail: EventDetail,
    pub partial: Weak<LivePartial>,
    pub element: Arc<dyn Element>,
    pub partial_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub(crate) fn new(event: &str, detail: EventDetail, origin: &Origin) -> Self {
        Self {
            event: event.to_string(),
            detail,
            partial: origin.partial.clone(),
            element: Arc::clone(&origin.element),
            partial_name: origin.partial_name.clone(),
            timestamp: Utc::now(),
        }
    }

    /// The owning instance, if it is still alive.
    pub fn partial(&self) -> Option<Arc<LivePartial>> {
        self.partial.upgrade()
    }

    /// Serializable view: detail fields merged with `partialName` and `timestamp`.
    pub fn to_json(&self) -> Value {
        let mut value = match self.detail.to_json() {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("detail".to_string(), other);
                map
            }
        };
        value.insert("event".to_string(), json!(self.event));
        value.insert("partialName".to_string(), json!(self.partial_name));
        value.insert("timestamp".to_string(), json!(self.timestamp.to_rfc3339()));
        Value::Object(value)
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("event", &self.event)
            .field("detail", &self.detail)
            .field("element", &"<element>")
            .field("partial_name", &self.partial_name)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}
