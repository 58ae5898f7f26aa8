//! In-memory document for headless hosts and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    Document, DomError, Element, ATTR_ACTION_METHOD, ATTR_CONTROLLER_PATH, ATTR_MARKER,
    ATTR_PARTIAL_NAME, ATTR_STATE,
};

pub struct MemoryElement {
    attributes: HashMap<String, String>,
    content: Mutex<String>,
    detached: AtomicBool,
    reject_next: Mutex<Option<String>>,
    renders: AtomicUsize,
}

impl MemoryElement {
    pub fn builder() -> MemoryElementBuilder {
        MemoryElementBuilder::default()
    }

    /// A marked live partial element with the four standard attributes.
    pub fn live_partial(
        partial_name: &str,
        controller_path: &str,
        action_method: &str,
        state_json: &str,
    ) -> Arc<Self> {
        Self::builder()
            .attribute(ATTR_MARKER, "")
            .attribute(ATTR_PARTIAL_NAME, partial_name)
            .attribute(ATTR_CONTROLLER_PATH, controller_path)
            .attribute(ATTR_ACTION_METHOD, action_method)
            .attribute(ATTR_STATE, state_json)
            .build()
    }

    /// Make the next `set_inner_html` fail with `reason`.
    pub fn fail_next_render(&self, reason: impl Into<String>) {
        *self.reject_next.lock().expect("element mutex poisoned") = Some(reason.into());
    }

    /// Simulate removal from the page; later renders fail.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }

    /// Number of successful content replacements.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl Element for MemoryElement {
    fn attribute(&self, name: &str) -> Option<String> {
        self.attributes.get(name).cloned()
    }

    fn inner_html(&self) -> String {
        self.content.lock().expect("element mutex poisoned").clone()
    }

    fn set_inner_html(&self, html: &str) -> Result<(), DomError> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(DomError::Detached);
        }
        if let Some(reason) = self.reject_next.lock().expect("element mutex poisoned").take() {
            return Err(DomError::Rejected(reason));
        }
        *self.content.lock().expect("element mutex poisoned") = html.to_string();
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryElementBuilder {
    attributes: HashMap<String, String>,
    content: String,
}

impl MemoryElementBuilder {
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn inner_html(mut self, html: impl Into<String>) -> Self {
        self.content = html.into();
        self
    }

    pub fn build(self) -> Arc<MemoryElement> {
        Arc::new(MemoryElement {
            attributes: self.attributes,
            content: Mutex::new(self.content),
            detached: AtomicBool::new(false),
            reject_next: Mutex::new(None),
            renders: AtomicUsize::new(0),
        })
    }
}

#[derive(Default)]
pub struct MemoryDocument {
    elements: Mutex<Vec<Arc<MemoryElement>>>,
    csrf_token: Mutex<Option<String>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csrf_token(token: impl Into<String>) -> Self {
        let document = Self::default();
        document.set_csrf_token(Some(token.into()));
        document
    }

    /// Append an element (marked or not) in document order.
    pub fn append(&self, element: Arc<MemoryElement>) {
        self.elements.lock().expect("document mutex poisoned").push(element);
    }

    pub fn set_csrf_token(&self, token: Option<String>) {
        *self.csrf_token.lock().expect("document mutex poisoned") = token;
    }
}

impl Document for MemoryDocument {
    fn query_live_partials(&self) -> Vec<Arc<dyn Element>> {
        self.elements
            .lock()
            .expect("document mutex poisoned")
            .iter()
            .filter(|element| element.attribute(ATTR_MARKER).is_some())
            .map(|element| Arc::clone(element) as Arc<dyn Element>)
            .collect()
    }

    fn csrf_token(&self) -> Option<String> {
        self.csrf_token.lock().expect("document mutex poisoned").clone()
    }
}
