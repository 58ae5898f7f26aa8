use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::event_types::dom_event_name;
use super::notification::Notification;

/// A DOM-level custom event: the namespaced name plus the same
/// notification local handlers received.
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub id: String,
    pub seq: i64,
    pub event_type: String,
    pub bubbles: bool,
    pub created_at: String,
    pub detail: Notification,
}

/// Receiving end of a DOM listener. Never lags: every dispatched event is
/// queued until the listener reads it.
pub type DomReceiver = mpsc::UnboundedReceiver<DomEvent>;

/// Listener list standing in for `addEventListener` on one node.
///
/// Each listener owns an unbounded queue. Listeners whose receiver was
/// dropped are pruned on the next send.
#[derive(Clone, Default)]
pub struct DomListeners {
    senders: Arc<Mutex<Vec<mpsc::UnboundedSender<DomEvent>>>>,
}

impl DomListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> DomReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders
            .lock()
            .expect("dom listener mutex poisoned")
            .push(tx);
        rx
    }

    /// Queue `event` for every live listener. Returns how many received it.
    pub fn send(&self, event: &DomEvent) -> usize {
        let mut senders = self.senders.lock().expect("dom listener mutex poisoned");
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        senders.len()
    }

    pub fn listener_count(&self) -> usize {
        self.senders
            .lock()
            .expect("dom listener mutex poisoned")
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

/// Per-element channel standing in for `element.dispatchEvent`.
///
/// Bubbling events are forwarded to the parent (document-level) listeners
/// when one is attached.
pub struct DomChannel {
    listeners: DomListeners,
    parent: Option<DomListeners>,
    seq: AtomicI64,
}

impl DomChannel {
    pub fn new() -> Self {
        Self {
            listeners: DomListeners::new(),
            parent: None,
            seq: AtomicI64::new(0),
        }
    }

    /// A channel whose bubbling events also reach `parent`.
    pub fn with_parent(parent: DomListeners) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new()
        }
    }

    /// Build and dispatch the namespaced event for `notification`.
    pub fn dispatch(&self, notification: &Notification) -> DomEvent {
        let event = DomEvent {
            id: Uuid::new_v4().to_string(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            event_type: dom_event_name(&notification.event),
            bubbles: true,
            created_at: Utc::now().to_rfc3339(),
            detail: notification.clone(),
        };
        self.publish(&event);
        event
    }

    fn publish(&self, event: &DomEvent) {
        if self.listeners.send(event) == 0 {
            tracing::trace!(event = %event.event_type, "no element listeners");
        }
        if event.bubbles {
            if let Some(parent) = &self.parent {
                if parent.send(event) == 0 {
                    tracing::trace!("no document listeners");
                }
            }
        }
    }

    pub fn subscribe(&self) -> DomReceiver {
        self.listeners.subscribe()
    }
}

impl Default for DomChannel {
    fn default() -> Self {
        Self::new()
    }
}
