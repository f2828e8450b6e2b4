//! Service seams to the external collaborators
//!
//! The enrichment service and the listing store are black boxes to this
//! crate. These traits are the only way pipeline code talks to them, which
//! keeps the orchestration logic testable against in-memory fakes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identifier::Identifier;
use super::outcome::ReconciliationOutcome;
use super::preview::{ListingRecord, PreviewItem};
use super::session::TargetSpec;

/// One event on the incremental delivery stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// One identifier's enrichment completed
    Item { item: PreviewItem },
    /// Terminal sentinel; no further events follow
    Done,
}

/// Failures talking to the enrichment service
#[derive(Debug, Clone, Error)]
pub enum EnrichmentError {
    #[error("enrichment call timed out after {0}ms")]
    Timeout(u64),
    #[error("enrichment transport error: {0}")]
    Transport(String),
    #[error("enrichment service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed enrichment payload: {0}")]
    Protocol(String),
}

/// Failures talking to the listing store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("listing store transport error: {0}")]
    Transport(String),
    #[error("listing store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed bulk-save response: {0}")]
    Protocol(String),
}

/// Failures of the commit operation itself
#[derive(Debug, Clone, Error)]
pub enum CommitError {
    /// The commit call never reached a store decision; the session is left
    /// intact and the commit can be retried without re-enrichment.
    #[error("commit transport failure (session preserved): {0}")]
    Transport(#[from] StoreError),
    #[error("nothing to commit: session has no committable items")]
    NothingToCommit,
    #[error("session is already closed")]
    SessionClosed,
}

/// Bulk-save request sent to the listing store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSaveRequest {
    pub target: TargetSpec,
    pub listings: Vec<ListingRecord>,
    pub options: BulkSaveOptions,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BulkSaveOptions {
    /// Skip (rather than fail) listings whose SKU already exists
    pub skip_duplicates: bool,
}

/// The external process that turns identifiers into candidate listings
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    /// Enrich one batch of identifiers in a single request/response call.
    /// Each returned item's id matches one requested identifier.
    async fn enrich_batch(
        &self,
        target: &TargetSpec,
        identifiers: &[Identifier],
    ) -> Result<Vec<PreviewItem>, EnrichmentError>;

    /// Open a long-lived stream delivering one item-complete event per
    /// requested identifier, terminated by [`StreamEvent::Done`].
    async fn open_stream(
        &self,
        target: &TargetSpec,
        identifiers: &[Identifier],
    ) -> Result<BoxStream<'static, Result<StreamEvent, EnrichmentError>>, EnrichmentError>;
}

/// The external listing store's bulk-save contract
#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn bulk_save(&self, request: BulkSaveRequest)
        -> Result<ReconciliationOutcome, StoreError>;
}
