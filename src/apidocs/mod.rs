//! OpenAPI document refresh.
//!
//! Pulls the OpenAPI JSON a running service publishes, applies branding
//! overrides and stores it as YAML:
//!
//! ```rust,ignore
//! use fleetlock::apidocs::{self, DocBranding};
//!
//! let doc = apidocs::fetch("http://localhost:8080/v3/api-docs").await?;
//! let doc = apidocs::enhance(doc, &DocBranding::new().with_title("Fleet API"));
//! apidocs::save(&doc, "swagger.yaml")?;
//! ```

pub mod client;
pub mod document;
pub mod writer;

pub use client::{ApiDocsClient, DEFAULT_TIMEOUT};
pub use document::{ApiDocument, DocBranding, ServerEntry};
pub use writer::save;

use crate::error::ApiDocsError;

/// Fetches and validates the document at `url` with a default client.
pub async fn fetch(url: &str) -> Result<ApiDocument, ApiDocsError> {
    ApiDocsClient::new().fetch(url).await
}

/// Applies `branding` to `document`.
pub fn enhance(document: ApiDocument, branding: &DocBranding) -> ApiDocument {
    document.enhance(branding)
}
