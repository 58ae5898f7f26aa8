//! Boundary traits for the page the partials live in.
//!
//! The sync engine never walks a DOM itself: it reads attributes from, and
//! writes markup into, whatever implements [`Element`], and discovers bound
//! elements through [`Document`].

pub mod memory;

use std::sync::Arc;

use thiserror::Error;

/// Marker attribute carried by every live partial element.
pub const ATTR_MARKER: &str = "data-live-partial";
/// JSON snapshot seeding the instance state.
pub const ATTR_STATE: &str = "data-state";
pub const ATTR_PARTIAL_NAME: &str = "data-partial-name";
pub const ATTR_CONTROLLER_PATH: &str = "data-controller-path";
pub const ATTR_ACTION_METHOD: &str = "data-action-method";

#[derive(Debug, Error)]
pub enum DomError {
    #[error("element is no longer attached to the document")]
    Detached,
    #[error("content replacement rejected: {0}")]
    Rejected(String),
}

/// A bound element. Implementations must be cheap to share across tasks.
pub trait Element: Send + Sync {
    fn attribute(&self, name: &str) -> Option<String>;
    fn inner_html(&self) -> String;
    /// Replace the whole rendered content verbatim.
    fn set_inner_html(&self, html: &str) -> Result<(), DomError>;
}

/// The page: source of bound elements and the anti-forgery token.
pub trait Document: Send + Sync {
    /// Every element carrying [`ATTR_MARKER`], in document order.
    fn query_live_partials(&self) -> Vec<Arc<dyn Element>>;
    /// Content of the page's `csrf-token` meta tag.
    fn csrf_token(&self) -> Option<String>;
}
