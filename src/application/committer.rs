//! Commit of a reviewed session against the listing store
//!
//! Submits the non-error subset of a session as one bulk-save request and
//! interprets the store's counts object. Nothing in the session is mutated
//! before the store answers: a transport failure leaves the session intact
//! and dirty so the operator can retry the commit without re-running
//! enrichment.

use std::sync::Arc;
use tracing::{info, warn};

use crate::application::events::EventEmitter;
use crate::domain::outcome::CommitReport;
use crate::domain::services::{BulkSaveOptions, BulkSaveRequest, CommitError, ListingStore};
use crate::domain::session::SharedSession;

/// Drives one commit call and the resulting session teardown
pub struct ReconciliationCommitter {
    store: Arc<dyn ListingStore>,
    emitter: EventEmitter,
}

impl ReconciliationCommitter {
    pub fn new(store: Arc<dyn ListingStore>, emitter: EventEmitter) -> Self {
        Self { store, emitter }
    }

    /// Submit every committable item's effective record in one bulk-save
    /// call. On success the session is torn down and the report carries the
    /// committed SKUs so the caller can clear its source candidate list.
    pub async fn commit(
        &self,
        session: &SharedSession,
        options: BulkSaveOptions,
    ) -> Result<CommitReport, CommitError> {
        let (session_id, request, not_submitted, committed_skus) = {
            let guard = session.read().await;
            if guard.is_closed() {
                return Err(CommitError::SessionClosed);
            }
            let (records, not_submitted) = guard.commit_payload();
            if records.is_empty() {
                return Err(CommitError::NothingToCommit);
            }
            let committed_skus: Vec<String> =
                records.iter().map(|record| record.sku.clone()).collect();
            let request = BulkSaveRequest {
                target: guard.target.clone(),
                listings: records,
                options,
            };
            (guard.session_id.clone(), request, not_submitted, committed_skus)
        };

        let submitted = request.listings.len();
        info!(session_id = %session_id, submitted, excluded = not_submitted.len(),
            "submitting bulk save");

        let outcome = match self.store.bulk_save(request).await {
            Ok(outcome) => outcome,
            Err(error) => {
                // the store never reached a decision; keep the session so
                // the operator can retry the commit as-is
                warn!(session_id = %session_id, %error, "commit call failed, session preserved");
                return Err(CommitError::Transport(error));
            }
        };

        info!(session_id = %session_id, %outcome, "bulk save reconciled");
        {
            let mut guard = session.write().await;
            guard.mark_clean();
            guard.teardown();
        }
        self.emitter.emit_commit_finished(&session_id, outcome.clone()).await;

        Ok(CommitReport {
            session_id,
            submitted,
            not_submitted,
            committed_skus,
            outcome,
        })
    }
}
