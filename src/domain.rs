//! Domain module - pipeline data model and business rules
//!
//! Identifier normalization, preview-item state, review sessions,
//! reconciliation outcomes, and the service traits for the external
//! collaborators. No I/O lives here.

pub mod constants;
pub mod events;
pub mod identifier;
pub mod outcome;
pub mod preview;
pub mod services;
pub mod session;

// Re-export commonly used items for convenience
pub use events::{EnrichmentProgress, EnrichmentSummary, PipelineEvent};
pub use identifier::{normalize, Identifier, IdentifierKind, NormalizePolicy, NormalizeStats, NormalizedSet};
pub use outcome::{CommitReport, ReconciliationOutcome, RejectedListing};
pub use preview::{CandidateListing, EditOverlay, ListingRecord, PreviewItem, PreviewStatus, PricingBreakdown, SourceSnapshot};
pub use services::{
    BulkSaveOptions, BulkSaveRequest, CommitError, EnrichmentError, EnrichmentService,
    ListingStore, StoreError, StreamEvent,
};
pub use session::{ReviewSession, SessionSummary, SharedSession, TargetSpec};
