//! HTTP client for OpenAPI JSON endpoints.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;

use super::document::ApiDocument;
use crate::error::ApiDocsError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches OpenAPI documents from a running server.
#[derive(Debug, Clone)]
pub struct ApiDocsClient {
    client: Client,
}

impl Default for ApiDocsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiDocsClient {
    /// Create a client with the default 30 second timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Wrap an already configured `reqwest` client.
    pub fn with_http_client(client: Client) -> Self {
        Self { client }
    }

    /// GETs `url` and parses the body as an OpenAPI document.
    ///
    /// Connection failures, timeouts and non-2xx statuses are reported as
    /// `Transport`; body problems come from [`ApiDocument::from_json_str`].
    pub async fn fetch(&self, url: &str) -> Result<ApiDocument, ApiDocsError> {
        let transport = |reason: String| ApiDocsError::Transport {
            url: url.to_string(),
            reason,
        };

        tracing::debug!(url = %url, "Fetching OpenAPI document");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = %status, body = %body, "Server returned error");
            return Err(transport(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let document = ApiDocument::from_json_str(&body)?;
        tracing::debug!(url = %url, paths = document.path_count(), "Fetched OpenAPI document");
        Ok(document)
    }
}
