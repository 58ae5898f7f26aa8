use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::runtime::Handle;

use super::SyncError;
use crate::bus::event_types::*;
use crate::bus::{
    DomChannel, DomListeners, DomReceiver, EventDetail, HandlerId, Notification, NotificationBus,
    Origin, Subscription,
};
use crate::config::LivePartialConfig;
use crate::debounce::Debouncer;
use crate::dom::{
    Document, Element, ATTR_ACTION_METHOD, ATTR_CONTROLLER_PATH, ATTR_PARTIAL_NAME, ATTR_STATE,
};
use crate::state::{ReactiveState, StateChange};
use crate::transport::{SyncRequest, Transport, PARTIAL_NAME_KEY};

/// Collaborators shared by every instance on a page.
#[derive(Clone)]
pub struct PartialContext {
    pub document: Arc<dyn Document>,
    pub transport: Arc<dyn Transport>,
    pub config: LivePartialConfig,
    pub runtime: Handle,
    /// Document-level listeners bubbling events are forwarded to.
    pub document_events: Option<DomListeners>,
}

/// One bound element with its state, bus and debounce timer.
pub struct LivePartial {
    element: Arc<dyn Element>,
    document: Arc<dyn Document>,
    transport: Arc<dyn Transport>,
    me: Weak<LivePartial>,
    partial_name: Option<String>,
    controller_path: Option<String>,
    action_method: Option<String>,
    state: ReactiveState,
    bus: NotificationBus,
    debouncer: Debouncer,
    discard_stale_responses: bool,
    requests_sent: AtomicU64,
    latest_rendered: AtomicU64,
}

impl LivePartial {
    /// Bind `element`, seed state from its snapshot and emit `initialized`.
    pub fn new(element: Arc<dyn Element>, context: &PartialContext) -> Arc<Self> {
        let partial_name = element.attribute(ATTR_PARTIAL_NAME);
        let snapshot = element.attribute(ATTR_STATE);

        let partial = Arc::new_cyclic(|me: &Weak<LivePartial>| {
            let hook_owner = me.clone();
            let state = ReactiveState::from_snapshot(
                snapshot.as_deref(),
                Box::new(move |change: StateChange| {
                    if let Some(partial) = hook_owner.upgrade() {
                        partial.on_state_commit(change);
                    }
                }),
            );

            let dom = match &context.document_events {
                Some(parent) => DomChannel::with_parent(parent.clone()),
                None => DomChannel::new(),
            };
            let bus = NotificationBus::new(
                Origin {
                    partial: me.clone(),
                    element: Arc::clone(&element),
                    partial_name: partial_name.clone(),
                },
                dom,
            );

            let debouncer = Debouncer::new(context.config.debounce(), context.runtime.clone())
                .with_max_wait(context.config.max_wait());

            Self {
                controller_path: element.attribute(ATTR_CONTROLLER_PATH),
                action_method: element.attribute(ATTR_ACTION_METHOD),
                element: Arc::clone(&element),
                document: Arc::clone(&context.document),
                transport: Arc::clone(&context.transport),
                me: me.clone(),
                partial_name: partial_name.clone(),
                state,
                bus,
                debouncer,
                discard_stale_responses: context.config.discard_stale_responses,
                requests_sent: AtomicU64::new(0),
                latest_rendered: AtomicU64::new(0),
            }
        });

        tracing::debug!(
            partial = partial.partial_name.as_deref().unwrap_or("<unnamed>"),
            keys = partial.state.len(),
            "live partial initialized"
        );
        partial.bus.emit(EVENT_INITIALIZED, EventDetail::Initialized);
        partial
    }

    pub fn state(&self) -> &ReactiveState {
        &self.state
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn element(&self) -> &Arc<dyn Element> {
        &self.element
    }

    pub fn partial_name(&self) -> Option<&str> {
        self.partial_name.as_deref()
    }

    pub fn on(
        &self,
        event: impl Into<String>,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> Subscription {
        self.bus.subscribe(event, handler)
    }

    pub fn off(&self, event: &str, id: HandlerId) {
        self.bus.unsubscribe(event, id);
    }

    /// Emit a custom event through this instance's bus and element channel.
    pub fn emit(&self, event: &str, payload: Value) -> Notification {
        self.bus.emit(event, EventDetail::Custom(payload))
    }

    pub fn subscribe_dom(&self) -> DomReceiver {
        self.bus.subscribe_dom()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Drop the armed debounce timer. In-flight requests are not affected.
    pub fn cancel_pending(&self) -> bool {
        self.debouncer.cancel()
    }

    fn on_state_commit(&self, change: StateChange) {
        self.bus.emit(
            EVENT_STATE_CHANGE,
            EventDetail::StateChange {
                prop: change.prop,
                value: change.value,
                old_value: change.old_value,
            },
        );
        self.handle_state_change();
    }

    /// Announce the pending sync and (re)arm the debounce timer.
    pub fn handle_state_change(&self) {
        self.bus.emit(
            EVENT_BEFORE_DEBOUNCE,
            EventDetail::BeforeDebounce {
                state: self.state.snapshot(),
            },
        );

        let me = self.me.clone();
        self.debouncer.schedule(move || async move {
            if let Some(partial) = me.upgrade() {
                partial.send_update().await;
            }
        });
    }

    /// Run one sync cycle. Failures never propagate: they are reported once
    /// through the `error` event and the element keeps its content.
    pub async fn send_update(&self) {
        if let Err(error) = self.exchange().await {
            tracing::warn!(
                partial = self.partial_name.as_deref().unwrap_or("<unnamed>"),
                "live partial sync failed: {error}"
            );
            self.bus.emit(
                EVENT_ERROR,
                EventDetail::Error {
                    error: Arc::new(error),
                },
            );
        }
    }

    async fn exchange(&self) -> Result<(), SyncError> {
        self.bus.emit(
            EVENT_BEFORE_UPDATE,
            EventDetail::BeforeUpdate {
                state: self.state.snapshot(),
            },
        );

        let request = self.build_request()?;
        let ticket = self.requests_sent.fetch_add(1, Ordering::SeqCst) + 1;
        let response = self.transport.post(request).await?;

        if self.discard_stale_responses && self.latest_rendered.load(Ordering::SeqCst) > ticket {
            tracing::debug!(ticket, "discarding response overtaken by a newer render");
            return Ok(());
        }

        if !response.is_success() {
            tracing::debug!(status = response.status, "rendering non-success response body");
        }
        let html = response.body.clone();
        self.bus.emit(
            EVENT_BEFORE_RENDER,
            EventDetail::BeforeRender {
                html: html.clone(),
                response: response.clone(),
            },
        );
        self.element.set_inner_html(&html)?;
        self.latest_rendered.fetch_max(ticket, Ordering::SeqCst);
        self.bus.emit(EVENT_AFTER_RENDER, EventDetail::AfterRender { html, response });
        Ok(())
    }

    /// The POST this instance would send right now.
    pub fn build_request(&self) -> Result<SyncRequest, SyncError> {
        let controller = self
            .controller_path
            .as_deref()
            .ok_or(SyncError::MissingAttribute(ATTR_CONTROLLER_PATH))?;
        let action = self
            .action_method
            .as_deref()
            .ok_or(SyncError::MissingAttribute(ATTR_ACTION_METHOD))?;

        // The reserved key only ever carries this element's partial name.
        let mut body = self.state.snapshot();
        if body.remove(PARTIAL_NAME_KEY).is_some() {
            tracing::warn!("state key {PARTIAL_NAME_KEY} is reserved and is not sent as state");
        }
        if let Some(name) = &self.partial_name {
            body.insert(PARTIAL_NAME_KEY.to_string(), Value::String(name.clone()));
        }

        Ok(SyncRequest {
            path: format!(
                "/{}/{}",
                controller.trim_matches('/'),
                action.trim_matches('/')
            ),
            body,
            csrf_token: self.document.csrf_token(),
        })
    }
}

impl std::fmt::Debug for LivePartial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePartial")
            .field("partial_name", &self.partial_name)
            .field("controller_path", &self.controller_path)
            .field("action_method", &self.action_method)
            .field("pending", &self.is_pending())
            .finish()
    }
}
