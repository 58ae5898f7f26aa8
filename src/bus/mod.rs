//! Notification system for partial lifecycle events.
//!
//! The bus provides:
//! - Named-event subscription with ordered, panic-isolated delivery
//! - Rebroadcast of every emission as a namespaced DOM-level event
//!
//! # Architecture
//!
//! Events flow from instance -> NotificationBus -> DomChannel -> document:
//! - `NotificationBus`: synchronous handlers registered per event name
//! - `DomChannel`: per-element listener list (`live-partial:<event>`)
//! - Bubbling events are forwarded to the registry's document listeners

mod dom_channel;
pub mod event_types;
mod notification;
mod notification_bus;

pub use dom_channel::{DomChannel, DomEvent, DomListeners, DomReceiver};
pub use notification::{EventDetail, Notification};
pub(crate) use notification::Origin;
pub use notification_bus::{HandlerFn, HandlerId, NotificationBus, Subscription};
