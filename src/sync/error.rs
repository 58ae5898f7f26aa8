use crate::dom::DomError;

/// Why a sync cycle failed. Surfaced only through the `error` event.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("unreadable response body: {0}")]
    Body(String),
    #[error("payload encoding failed: {0}")]
    Encode(String),
    #[error("render failed: {0}")]
    Render(#[from] DomError),
    #[error("element is missing the {0} attribute")]
    MissingAttribute(&'static str),
}

impl From<reqwest::Error> for SyncError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_builder() {
            return Self::Encode(value.to_string());
        }
        if value.is_body() || value.is_decode() {
            return Self::Body(value.to_string());
        }
        Self::Request(value.to_string())
    }
}
