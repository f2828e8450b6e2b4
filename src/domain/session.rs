//! In-memory review session state
//!
//! One `ReviewSession` holds the full item set for one operator run: the
//! ordered preview items, the review cursor, the dirty flag, and ownership
//! of any live enrichment stream. It is the only mutable structure the
//! pipeline shares; the orchestrator, the stream consumer, and the
//! committer all mutate it through the merge/edit operations here, behind
//! one `Arc<RwLock<_>>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::identifier::Identifier;
use super::preview::{ListingRecord, PreviewItem, PreviewStatus};

/// Shared handle to a session; the lock is the concurrency boundary
pub type SharedSession = Arc<RwLock<ReviewSession>>;

/// Destination marketplace + listing template for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub marketplace: String,
    pub template_id: String,
    /// Per-field display/commit fallbacks from the template; applied last
    /// when computing effective records, never written back
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

/// Snapshot of per-status counts and progress for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total: usize,
    pub loading: usize,
    pub ready: usize,
    pub warning: usize,
    pub error: usize,
    pub completed: usize,
}

impl SessionSummary {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.completed as f64 / self.total as f64 * 100.0 }
    }
}

/// One operator run's preview items plus cursor and dirty state
#[derive(Debug)]
pub struct ReviewSession {
    pub session_id: String,
    pub target: TargetSpec,
    pub started_at: DateTime<Utc>,
    items: Vec<PreviewItem>,
    index: HashMap<String, usize>,
    cursor: usize,
    dirty: bool,
    /// True while the unsaved-changes confirmation is pending; navigation
    /// and close are ignored until resolved
    guard_pending: bool,
    closed: bool,
    /// Identifiers whose enrichment attempt has settled, success or failure.
    /// Monotonic; drives progress reporting.
    completed_count: usize,
    stream_cancel: Option<CancellationToken>,
}

impl ReviewSession {
    /// Create a session seeded with one loading placeholder per identifier,
    /// so the review surface has a stable row set before any data arrives.
    pub fn new(target: TargetSpec, identifiers: &[Identifier]) -> Self {
        let items: Vec<PreviewItem> =
            identifiers.iter().cloned().map(PreviewItem::placeholder).collect();
        let index = items
            .iter()
            .enumerate()
            .map(|(pos, item)| (item.id.clone(), pos))
            .collect();
        Self {
            session_id: Uuid::new_v4().to_string(),
            target,
            started_at: Utc::now(),
            items,
            index,
            cursor: 0,
            dirty: false,
            guard_pending: false,
            closed: false,
            completed_count: 0,
            stream_cancel: None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn items(&self) -> &[PreviewItem] {
        &self.items
    }

    pub fn item(&self, id: &str) -> Option<&PreviewItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    // --- merge ---------------------------------------------------------

    /// Merge a delivered item into the session by id, replacing whatever is
    /// there (placeholder or earlier delivery; last write wins). Merges for
    /// distinct ids commute. Returns false when the update was discarded:
    /// the session is already closed, or the id was never requested.
    pub fn merge(&mut self, item: PreviewItem) -> bool {
        if self.closed {
            tracing::debug!(session_id = %self.session_id, item_id = %item.id,
                "discarding merge into closed session");
            return false;
        }
        match self.index.get(&item.id) {
            Some(&pos) => {
                // reviewer edits survive a re-delivery of the same id
                let edits = std::mem::take(&mut self.items[pos].edits);
                self.items[pos] = item;
                self.items[pos].edits = edits;
                true
            }
            None => {
                tracing::warn!(session_id = %self.session_id, item_id = %item.id,
                    "enrichment delivered an item that was never requested");
                false
            }
        }
    }

    /// Mark every given identifier as failed with the same message
    /// (batch-level failure semantics).
    pub fn mark_failed(&mut self, ids: &[String], message: &str) {
        if self.closed {
            return;
        }
        for id in ids {
            if let Some(&pos) = self.index.get(id) {
                self.items[pos].mark_failed(message.to_string());
            }
        }
    }

    /// Record that `n` more identifiers have settled. Monotonic.
    pub fn record_completed(&mut self, n: usize) {
        self.completed_count = (self.completed_count + n).min(self.items.len());
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    /// Scan current statuses into a summary snapshot
    pub fn summary(&self) -> SessionSummary {
        let mut summary = SessionSummary {
            total: self.items.len(),
            loading: 0,
            ready: 0,
            warning: 0,
            error: 0,
            completed: self.completed_count,
        };
        for item in &self.items {
            match item.status {
                PreviewStatus::Loading => summary.loading += 1,
                PreviewStatus::Ready => summary.ready += 1,
                PreviewStatus::Warning => summary.warning += 1,
                PreviewStatus::Error => summary.error += 1,
            }
        }
        summary
    }

    // --- review cursor -------------------------------------------------

    pub fn current_item(&self) -> Option<&PreviewItem> {
        self.items.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advance the cursor; no-op at the end or while the close guard is up
    pub fn next(&mut self) {
        if !self.guard_pending && self.cursor + 1 < self.items.len() {
            self.cursor += 1;
        }
    }

    /// Step the cursor back; no-op at the start or while the guard is up
    pub fn previous(&mut self) {
        if !self.guard_pending && self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    // --- edits ---------------------------------------------------------

    /// Record a reviewer edit on one item's overlay and mark the session
    /// dirty. Unknown ids are ignored.
    pub fn edit(&mut self, item_id: &str, field: &str, value: String, is_custom: bool) {
        if let Some(&pos) = self.index.get(item_id) {
            self.items[pos].apply_edit(field, value, is_custom);
            self.dirty = true;
        }
    }

    /// Effective record for one item under this session's template defaults
    pub fn effective_record(&self, item_id: &str) -> Option<ListingRecord> {
        self.item(item_id)?.effective_record(&self.target.defaults)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    // --- close guard ---------------------------------------------------

    /// Ask to close the review. Clean sessions tear down immediately and
    /// return true; dirty sessions raise the confirmation guard and return
    /// false until the operator resolves it.
    pub fn request_close(&mut self) -> bool {
        if self.guard_pending {
            return false;
        }
        if self.dirty {
            self.guard_pending = true;
            false
        } else {
            self.teardown();
            true
        }
    }

    /// Operator confirmed discarding unsaved edits
    pub fn confirm_close(&mut self) {
        if self.guard_pending {
            self.guard_pending = false;
            self.teardown();
        }
    }

    /// Operator kept the session open
    pub fn cancel_close(&mut self) {
        self.guard_pending = false;
    }

    pub fn guard_pending(&self) -> bool {
        self.guard_pending
    }

    // --- stream handle ownership --------------------------------------

    /// Hand the session ownership of the live stream's cancellation handle.
    /// Teardown cancels it, so a closed review never leaks a connection.
    pub fn attach_stream(&mut self, token: CancellationToken) {
        // a replaced handle is cancelled rather than leaked
        if let Some(previous) = self.stream_cancel.replace(token) {
            previous.cancel();
        }
    }

    pub fn detach_stream(&mut self) {
        self.stream_cancel = None;
    }

    pub fn has_live_stream(&self) -> bool {
        self.stream_cancel.is_some()
    }

    /// Tear the session down: cancel any live stream and stop accepting
    /// merges. In-flight batch results against a closed session are
    /// discarded by `merge`.
    pub fn teardown(&mut self) {
        if let Some(token) = self.stream_cancel.take() {
            token.cancel();
        }
        self.closed = true;
        tracing::info!(session_id = %self.session_id, "review session torn down");
    }

    // --- commit selection ---------------------------------------------

    /// Records to submit (status ready/warning) plus the ids excluded as
    /// "not submitted". Loading and error items are never submitted.
    pub fn commit_payload(&self) -> (Vec<ListingRecord>, Vec<String>) {
        let mut records = Vec::new();
        let mut not_submitted = Vec::new();
        for item in &self.items {
            match item.effective_record(&self.target.defaults) {
                Some(record) if item.is_committable() => records.push(record),
                _ => not_submitted.push(item.id.clone()),
            }
        }
        (records, not_submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identifier::{IdentifierKind, normalize, NormalizePolicy};
    use crate::domain::preview::test_support::ready_item;
    use proptest::prelude::*;

    fn target() -> TargetSpec {
        TargetSpec {
            marketplace: "shopee-sg".to_string(),
            template_id: "default".to_string(),
            defaults: BTreeMap::new(),
        }
    }

    fn session_for(raws: &[&str]) -> ReviewSession {
        let policy = NormalizePolicy { kind: IdentifierKind::Asin, max_items: 50 };
        let set = normalize(&raws.join(" "), &policy);
        ReviewSession::new(target(), &set.identifiers)
    }

    #[test]
    fn seeds_one_placeholder_per_identifier() {
        let session = session_for(&["B00EXAMPL0", "B00EXAMPL1"]);
        assert_eq!(session.len(), 2);
        assert!(session.items().iter().all(|i| i.status == PreviewStatus::Loading));
    }

    #[test]
    fn merge_replaces_placeholder_and_keeps_edits_on_redelivery() {
        let mut session = session_for(&["B00EXAMPL0"]);
        assert!(session.merge(ready_item("B00EXAMPL0")));
        session.edit("B00EXAMPL0", "title", "edited".to_string(), false);

        // a later delivery for the same id wins, but reviewer edits survive
        assert!(session.merge(ready_item("B00EXAMPL0")));
        let item = session.item("B00EXAMPL0").unwrap();
        assert_eq!(item.edits.fields["title"], "edited");
    }

    #[test]
    fn merge_ignores_unrequested_ids_and_closed_sessions() {
        let mut session = session_for(&["B00EXAMPL0"]);
        assert!(!session.merge(ready_item("B00EXAMPL9")));
        session.teardown();
        assert!(!session.merge(ready_item("B00EXAMPL0")));
    }

    #[test]
    fn cursor_is_bounds_checked() {
        let mut session = session_for(&["B00EXAMPL0", "B00EXAMPL1"]);
        session.previous();
        assert_eq!(session.cursor(), 0);
        session.next();
        assert_eq!(session.cursor(), 1);
        session.next();
        assert_eq!(session.cursor(), 1);
    }

    #[test]
    fn close_guard_blocks_navigation_until_resolved() {
        let mut session = session_for(&["B00EXAMPL0", "B00EXAMPL1"]);
        session.merge(ready_item("B00EXAMPL0"));
        session.edit("B00EXAMPL0", "title", "x".to_string(), false);

        assert!(!session.request_close());
        assert!(session.guard_pending());
        session.next();
        assert_eq!(session.cursor(), 0);

        session.cancel_close();
        session.next();
        assert_eq!(session.cursor(), 1);

        assert!(!session.request_close());
        session.confirm_close();
        assert!(session.is_closed());
    }

    #[test]
    fn clean_close_needs_no_confirmation() {
        let mut session = session_for(&["B00EXAMPL0"]);
        assert!(session.request_close());
        assert!(session.is_closed());
    }

    #[test]
    fn teardown_cancels_an_attached_stream() {
        let mut session = session_for(&["B00EXAMPL0"]);
        let token = CancellationToken::new();
        session.attach_stream(token.clone());
        assert!(session.has_live_stream());
        session.teardown();
        assert!(token.is_cancelled());
    }

    #[test]
    fn commit_payload_excludes_error_and_loading_items() {
        let mut session = session_for(&["B00EXAMPL0", "B00EXAMPL1", "B00EXAMPL2"]);
        session.merge(ready_item("B00EXAMPL0"));
        session.mark_failed(&["B00EXAMPL1".to_string()], "upstream 500");
        // B00EXAMPL2 still loading

        let (records, not_submitted) = session.commit_payload();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sku, "RL-B00EXAMPL0");
        assert_eq!(not_submitted, vec!["B00EXAMPL1".to_string(), "B00EXAMPL2".to_string()]);
    }

    #[test]
    fn completed_count_is_monotonic_and_capped() {
        let mut session = session_for(&["B00EXAMPL0", "B00EXAMPL1"]);
        session.record_completed(1);
        assert_eq!(session.completed_count(), 1);
        session.record_completed(5);
        assert_eq!(session.completed_count(), 2);
    }

    proptest! {
        /// Applying per-id updates in any permutation yields the same final
        /// per-id mapping.
        #[test]
        fn merges_commute_across_ids(order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()) {
            let raws: Vec<String> = (0..6).map(|i| format!("B00EXAMPL{i}")).collect();
            let raw_refs: Vec<&str> = raws.iter().map(String::as_str).collect();

            let mut reference = session_for(&raw_refs);
            for raw in &raws {
                reference.merge(ready_item(raw));
            }

            let mut permuted = session_for(&raw_refs);
            for &i in &order {
                permuted.merge(ready_item(&raws[i]));
            }

            for raw in &raws {
                let a = reference.item(raw).unwrap();
                let b = permuted.item(raw).unwrap();
                prop_assert_eq!(a.status, b.status);
                prop_assert_eq!(&a.generated, &b.generated);
            }
        }
    }
}
