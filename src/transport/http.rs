use async_trait::async_trait;

use super::{SyncRequest, SyncResponse, Transport};
use crate::config::LivePartialConfig;
use crate::sync::SyncError;

/// reqwest client posting JSON state and reading markup back.
///
/// No request timeout is configured: a hung request stays pending until the
/// server answers or the connection drops.
pub struct HttpTransport {
    base_url: String,
    csrf_header: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &LivePartialConfig) -> Result<Self, SyncError> {
        Ok(Self {
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            csrf_header: config.csrf_header.trim().to_string(),
            client: reqwest::Client::builder()
                .build()
                .map_err(|error| SyncError::Request(error.to_string()))?,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn map_connectivity_error(&self, error: reqwest::Error) -> SyncError {
        if error.is_connect() {
            return SyncError::Request(format!(
                "could not reach {}: {error}",
                self.base_url
            ));
        }
        SyncError::from(error)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: SyncRequest) -> Result<SyncResponse, SyncError> {
        let endpoint = self.endpoint(&request.path);

        // `json` sets `Content-Type: application/json`.
        let mut builder = self.client.post(&endpoint).json(&request.body);
        match &request.csrf_token {
            Some(token) => builder = builder.header(self.csrf_header.as_str(), token.as_str()),
            None => tracing::warn!(
                endpoint = %endpoint,
                "no csrf token on the page; sending without it"
            ),
        }

        tracing::debug!(
            endpoint = %endpoint,
            keys = request.body.len(),
            "posting partial state"
        );
        let response = builder
            .send()
            .await
            .map_err(|error| self.map_connectivity_error(error))?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await.map_err(|error| {
            SyncError::Body(format!("failed to read response from {endpoint}: {error}"))
        })?;

        tracing::debug!(
            endpoint = %endpoint,
            status,
            bytes = body.len(),
            "partial response received"
        );
        Ok(SyncResponse { status, url, body })
    }
}
