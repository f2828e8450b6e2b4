//! Reconciliation outcome of one bulk-save commit
//!
//! The listing store answers a bulk save with one counts object covering
//! the whole submitted set. Operators must always see all five counts,
//! zeros included, so "nothing happened" and "everything succeeded" are
//! distinguishable at a glance.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-SKU detail for a listing the store declined to apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedListing {
    pub sku: String,
    pub reason: String,
}

/// Result of one commit call, as reported by the listing store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub created: u32,
    pub updated: u32,
    pub reactivated: u32,
    pub failed: u32,
    pub skipped: u32,
    #[serde(default)]
    pub skipped_detail: Vec<RejectedListing>,
    #[serde(default)]
    pub failed_detail: Vec<RejectedListing>,
}

impl ReconciliationOutcome {
    /// Listings the store actually applied
    pub fn applied(&self) -> u32 {
        self.created + self.updated + self.reactivated
    }

    /// Total listings the store accounted for in this outcome
    pub fn accounted(&self) -> u32 {
        self.applied() + self.failed + self.skipped
    }
}

impl fmt::Display for ReconciliationOutcome {
    /// Renders every count, zero or not
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created {}, updated {}, reactivated {}, failed {}, skipped {}",
            self.created, self.updated, self.reactivated, self.failed, self.skipped
        )
    }
}

/// What the operator gets back from a commit: the store outcome plus the
/// items this side never submitted (error/loading), which are a different
/// population than store-rejected listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitReport {
    pub session_id: String,
    pub submitted: usize,
    /// Item ids excluded before submission (never sent to the store)
    pub not_submitted: Vec<String>,
    /// SKUs that were part of the submitted set, for source-list cleanup
    pub committed_skus: Vec<String>,
    pub outcome: ReconciliationOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_all_five_counts_including_zeros() {
        let outcome = ReconciliationOutcome {
            created: 7,
            updated: 0,
            reactivated: 1,
            failed: 1,
            skipped: 0,
            ..Default::default()
        };
        assert_eq!(
            outcome.to_string(),
            "created 7, updated 0, reactivated 1, failed 1, skipped 0"
        );
        assert_eq!(outcome.applied(), 8);
        assert_eq!(outcome.accounted(), 9);
    }

    #[test]
    fn zero_outcome_is_still_fully_rendered() {
        let outcome = ReconciliationOutcome::default();
        assert_eq!(
            outcome.to_string(),
            "created 0, updated 0, reactivated 0, failed 0, skipped 0"
        );
    }
}
