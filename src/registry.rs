//! Page-level registry of live partials.
//!
//! `discover` plays the role of the page-ready hook: it binds one
//! [`LivePartial`] to every marked element and keeps them addressable by
//! logical name. The registry is an explicit object so independent
//! documents (and tests) never share state.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use thiserror::Error;
use tokio::runtime::Handle;

use crate::bus::{DomListeners, DomReceiver};
use crate::config::{ConfigError, LivePartialConfig};
use crate::dom::Document;
use crate::sync::{LivePartial, PartialContext};
use crate::transport::Transport;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("live partials need a tokio runtime: {0}")]
    NoRuntime(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Every method takes `&self`, so a registry shared behind an `Arc` (for
/// example after [`lookup_fn`](Self::lookup_fn)) can still detach and tear down.
pub struct PartialRegistry {
    config: LivePartialConfig,
    instances: Mutex<Vec<Arc<LivePartial>>>,
    by_name: DashMap<String, Arc<LivePartial>>,
    document_events: DomListeners,
}

impl PartialRegistry {
    /// Bind every marked element of `document`, emitting `initialized` for
    /// each. Must run inside a tokio runtime.
    pub fn discover(
        document: Arc<dyn Document>,
        transport: Arc<dyn Transport>,
        config: LivePartialConfig,
    ) -> Result<Self, RegistryError> {
        Self::discover_with_listener(document, transport, config, DomListeners::new())
    }

    /// Like [`discover`](Self::discover), but with document listeners the
    /// caller already subscribed to, so `initialized` events are observable.
    pub fn discover_with_listener(
        document: Arc<dyn Document>,
        transport: Arc<dyn Transport>,
        config: LivePartialConfig,
        document_events: DomListeners,
    ) -> Result<Self, RegistryError> {
        config.validate()?;
        let runtime =
            Handle::try_current().map_err(|error| RegistryError::NoRuntime(error.to_string()))?;

        let context = PartialContext {
            document: Arc::clone(&document),
            transport,
            config: config.clone(),
            runtime,
            document_events: Some(document_events.clone()),
        };

        let registry = Self {
            config,
            instances: Mutex::new(Vec::new()),
            by_name: DashMap::new(),
            document_events,
        };
        Ok(registry.bind_all(document.as_ref(), &context))
    }

    fn bind_all(self, document: &dyn Document, context: &PartialContext) -> Self {
        let mut instances = Vec::new();
        for element in document.query_live_partials() {
            let partial = LivePartial::new(element, context);
            if let Some(name) = partial.partial_name() {
                // First element in document order answers lookups.
                self.by_name
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::clone(&partial));
            } else {
                tracing::warn!("live partial without a partial name; lookup cannot reach it");
            }
            instances.push(partial);
        }
        tracing::info!(count = instances.len(), "live partials discovered");
        *self.lock_instances() = instances;
        self
    }

    /// `widget` resolves as `<shared namespace>/widget`; names containing
    /// a `/` are used verbatim.
    pub fn normalize_name(&self, name: &str) -> String {
        if name.contains('/') {
            name.to_string()
        } else {
            format!("{}/{name}", self.config.shared_namespace)
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<LivePartial>> {
        self.by_name
            .get(&self.normalize_name(name))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Lookup as a standalone closure, for scripts that only need to
    /// resolve names.
    pub fn lookup_fn(
        self: &Arc<Self>,
    ) -> impl Fn(&str) -> Option<Arc<LivePartial>> + Send + Sync {
        let registry = Arc::downgrade(self);
        move |name| registry.upgrade().and_then(|registry| registry.lookup(name))
    }

    /// Every bound instance, in document order.
    pub fn instances(&self) -> Vec<Arc<LivePartial>> {
        self.lock_instances().clone()
    }

    pub fn len(&self) -> usize {
        self.lock_instances().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_instances().is_empty()
    }

    /// Receiver for bubbled events from every instance on the page.
    pub fn subscribe(&self) -> DomReceiver {
        self.document_events.subscribe()
    }

    /// Forget the instance bound under `name` (its element left the page).
    /// Its pending timer is cancelled; an in-flight request still completes.
    pub fn detach(&self, name: &str) -> Option<Arc<LivePartial>> {
        let (_, partial) = self.by_name.remove(&self.normalize_name(name))?;
        partial.cancel_pending();
        self.lock_instances().retain(|candidate| !Arc::ptr_eq(candidate, &partial));
        tracing::debug!(partial = name, "live partial detached");
        Some(partial)
    }

    /// Cancel every pending timer and drop all instances.
    pub fn teardown(&self) {
        let instances = std::mem::take(&mut *self.lock_instances());
        self.by_name.clear();
        for partial in &instances {
            partial.cancel_pending();
        }
        tracing::debug!(count = instances.len(), "live partial registry torn down");
    }

    fn lock_instances(&self) -> MutexGuard<'_, Vec<Arc<LivePartial>>> {
        self.instances.lock().expect("registry mutex poisoned")
    }
}

impl Drop for PartialRegistry {
    fn drop(&mut self) {
        self.teardown();
    }
}
