//! HTTP adapter for the listing store's bulk-save contract
//!
//! One POST per commit; the response body is the reconciliation counts
//! object, optionally carrying per-SKU detail arrays. Store-level
//! rejections ride inside the counts, never as an HTTP error.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::domain::outcome::ReconciliationOutcome;
use crate::domain::services::{BulkSaveRequest, ListingStore, StoreError};
use crate::infrastructure::http_client::HttpClient;

/// Listing store reachable over HTTP
pub struct HttpListingStore {
    http: Arc<HttpClient>,
    base_url: Url,
}

impl HttpListingStore {
    pub fn new(http: Arc<HttpClient>, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl ListingStore for HttpListingStore {
    async fn bulk_save(
        &self,
        request: BulkSaveRequest,
    ) -> Result<ReconciliationOutcome, StoreError> {
        let url = self
            .base_url
            .join("api/listings/bulk-save")
            .map_err(|e| StoreError::Protocol(format!("bad bulk-save endpoint: {e}")))?;

        let response = self
            .http
            .post_json(url.as_str(), &request)
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status: status.as_u16(), message });
        }

        let outcome: ReconciliationOutcome = response
            .json()
            .await
            .map_err(|e| StoreError::Protocol(e.to_string()))?;
        debug!(%outcome, "bulk-save response parsed");
        Ok(outcome)
    }
}
