use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use super::dom_channel::{DomChannel, DomReceiver};
use super::notification::{EventDetail, Notification, Origin};

/// Identifier returned by [`NotificationBus::subscribe`], usable with
/// [`NotificationBus::unsubscribe`].
pub type HandlerId = u64;

/// Closure type for event handlers.
pub type HandlerFn = dyn Fn(&Notification) + Send + Sync;

type HandlerMap = HashMap<String, Vec<(HandlerId, Arc<HandlerFn>)>>;

/// Named-event bus owned by one instance.
///
/// Handlers run synchronously in registration order. The handler list is
/// snapshotted before delivery and the lock is released, so handlers may
/// subscribe, unsubscribe or mutate state while an emission is running.
pub struct NotificationBus {
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: AtomicU64,
    origin: Origin,
    dom: DomChannel,
}

impl NotificationBus {
    pub(crate) fn new(origin: Origin, dom: DomChannel) -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            origin,
            dom,
        }
    }

    /// Register `handler` for `event`. Unknown names are fine: the list is
    /// created on first use.
    pub fn subscribe(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> Subscription {
        let event = event.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .expect("notification bus mutex poisoned")
            .entry(event.clone())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            handlers: Arc::downgrade(&self.handlers),
            event,
            id,
        }
    }

    /// Remove a handler. Unknown names and ids are ignored.
    pub fn unsubscribe(&self, event: &str, id: HandlerId) {
        remove_handler(&self.handlers, event, id);
    }

    /// Deliver `detail` to every handler of `event`, then rebroadcast it on
    /// the element channel. Returns the delivered notification.
    pub fn emit(&self, event: &str, detail: EventDetail) -> Notification {
        let notification = Notification::new(event, detail, &self.origin);

        let snapshot: Vec<Arc<HandlerFn>> = {
            let guard = self.handlers.lock().expect("notification bus mutex poisoned");
            guard
                .get(event)
                .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
                .unwrap_or_default()
        };

        tracing::debug!(
            event,
            partial = self.origin.partial_name.as_deref().unwrap_or("<unnamed>"),
            handlers = snapshot.len(),
            "emitting"
        );

        for handler in snapshot {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                handler(&notification);
            }));
            if outcome.is_err() {
                tracing::warn!(event, "event handler panicked; continuing with remaining handlers");
            }
        }

        self.dom.dispatch(&notification);
        notification
    }

    /// Number of handlers currently registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers
            .lock()
            .expect("notification bus mutex poisoned")
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Receiver for the namespaced DOM-level events of this element.
    pub fn subscribe_dom(&self) -> DomReceiver {
        self.dom.subscribe()
    }
}

fn remove_handler(handlers: &Mutex<HandlerMap>, event: &str, id: HandlerId) {
    let mut guard = handlers.lock().expect("notification bus mutex poisoned");
    if let Some(list) = guard.get_mut(event) {
        list.retain(|(handler_id, _)| *handler_id != id);
    }
}

/// Handle returned by [`NotificationBus::subscribe`].
///
/// Dropping it keeps the handler registered; call [`Subscription::unsubscribe`]
/// to remove it.
#[derive(Debug)]
pub struct Subscription {
    handlers: Weak<Mutex<HandlerMap>>,
    event: String,
    id: HandlerId,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn unsubscribe(self) {
        if let Some(handlers) = self.handlers.upgrade() {
            remove_handler(&handlers, &self.event, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Weak;

    use serde_json::json;

    use super::*;
    use crate::bus::event_types::*;
    use crate::bus::DomListeners;
    use crate::dom::memory::MemoryElement;

    fn bus_with_parent() -> (NotificationBus, DomReceiver) {
        let parent = DomListeners::new();
        let parent_rx = parent.subscribe();
        let element = MemoryElement::builder()
            .attribute("data-partial-name", "shared/widget")
            .build();
        let origin = Origin {
            partial: Weak::new(),
            element,
            partial_name: Some("shared/widget".to_string()),
        };
        (NotificationBus::new(origin, DomChannel::with_parent(parent)), parent_rx)
    }

    fn bus() -> NotificationBus {
        bus_with_parent().0
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = bus();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let seen = seen.clone();
            let _ = bus.subscribe(EVENT_STATE_CHANGE, move |_| {
                seen.lock().unwrap().push(label);
            });
        }

        bus.emit(EVENT_STATE_CHANGE, EventDetail::Custom(json!({})));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn emit_without_handlers_is_a_no_op() {
        let bus = bus();
        let notification = bus.emit("nobody-listens", EventDetail::Initialized);
        assert_eq!(notification.event, "nobody-listens");
        assert_eq!(bus.handler_count("nobody-listens"), 0);
    }

    #[test]
    fn panicking_handler_does_not_stop_later_handlers() {
        let bus = bus();
        let calls = Arc::new(AtomicU64::new(0));
        let _ = bus.subscribe(EVENT_ERROR, |_| panic!("handler failure"));
        let counter = calls.clone();
        let _ = bus.subscribe(EVENT_ERROR, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(EVENT_ERROR, EventDetail::Custom(json!({})));
        bus.emit(EVENT_ERROR, EventDetail::Custom(json!({})));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(bus.handler_count(EVENT_ERROR), 2);
    }

    #[test]
    fn subscription_unsubscribe_removes_only_that_handler() {
        let bus = bus();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let a = calls.clone();
        let first = bus.subscribe(EVENT_AFTER_RENDER, move |_| a.lock().unwrap().push("a"));
        let b = calls.clone();
        let _second = bus.subscribe(EVENT_AFTER_RENDER, move |_| b.lock().unwrap().push("b"));

        first.unsubscribe();
        bus.emit(EVENT_AFTER_RENDER, EventDetail::Initialized);

        assert_eq!(*calls.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn unsubscribe_by_id_and_unknown_names_are_tolerated() {
        let bus = bus();
        let subscription = bus.subscribe(EVENT_BEFORE_UPDATE, |_| {});
        bus.unsubscribe("never-registered", subscription.id());
        assert_eq!(bus.handler_count(EVENT_BEFORE_UPDATE), 1);

        bus.unsubscribe(EVENT_BEFORE_UPDATE, subscription.id());
        assert_eq!(bus.handler_count(EVENT_BEFORE_UPDATE), 0);
    }

    #[test]
    fn handler_may_subscribe_during_emission() {
        let bus = Arc::new(bus());
        let inner_calls = Arc::new(AtomicU64::new(0));
        let bus_ref = Arc::downgrade(&bus);
        let counter = inner_calls.clone();
        let _ = bus.subscribe("tick", move |_| {
            if let Some(bus) = bus_ref.upgrade() {
                let counter = counter.clone();
                let _ = bus.subscribe("tick", move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        bus.emit("tick", EventDetail::Initialized);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 0);

        bus.emit("tick", EventDetail::Initialized);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn notifications_carry_origin_metadata() {
        let bus = bus();
        let captured = Arc::new(Mutex::new(None));
        let slot = captured.clone();
        let _ = bus.subscribe(EVENT_INITIALIZED, move |n| {
            *slot.lock().unwrap() = Some(n.clone());
        });

        bus.emit(EVENT_INITIALIZED, EventDetail::Initialized);

        let notification = captured.lock().unwrap().clone().expect("handler ran");
        assert_eq!(notification.partial_name.as_deref(), Some("shared/widget"));
        assert_eq!(
            notification.element.attribute("data-partial-name").as_deref(),
            Some("shared/widget")
        );
        assert!(notification.partial().is_none());
        assert_eq!(notification.to_json()["partialName"], "shared/widget");
    }

    #[test]
    fn every_emission_is_rebroadcast_with_identical_detail() {
        let (bus, mut document_rx) = bus_with_parent();
        let mut element_rx = bus.subscribe_dom();
        let local = Arc::new(Mutex::new(None));
        let slot = local.clone();
        let _ = bus.subscribe(EVENT_STATE_CHANGE, move |n| {
            *slot.lock().unwrap() = Some(n.to_json());
        });

        bus.emit(
            EVENT_STATE_CHANGE,
            EventDetail::StateChange {
                prop: "count".to_string(),
                value: json!(1),
                old_value: Some(json!(0)),
            },
        );

        let dom_event = element_rx.try_recv().expect("element event");
        assert_eq!(dom_event.event_type, "live-partial:stateChange");
        assert!(dom_event.bubbles);
        assert_eq!(Some(dom_event.detail.to_json()), local.lock().unwrap().clone());
        assert_eq!(dom_event.detail.to_json()["oldValue"], 0);

        let bubbled = document_rx.try_recv().expect("document event");
        assert_eq!(bubbled.id, dom_event.id);
    }
}
