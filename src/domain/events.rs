//! Event types emitted by the pipeline for operator-facing surfaces
//!
//! Everything that happens between "enrichment triggered" and "commit
//! finished" is observable through these events: per-batch settlement,
//! per-item merges, progress snapshots, and the final summaries. Consumers
//! subscribe through the application-layer `EventEmitter`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::ReconciliationOutcome;
use super::preview::PreviewStatus;
use super::session::SessionSummary;

/// Progress snapshot for the enrichment phase of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentProgress {
    pub session_id: String,
    /// Identifiers whose enrichment attempt has settled
    pub completed: usize,
    pub total: usize,
    /// 0.0 to 100.0; monotonic non-decreasing, may jump by a whole batch
    pub percentage: f64,
}

/// Final per-status tally after all batches (or the stream) have settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    pub success_count: usize,
    pub failed_count: usize,
    pub warning_count: usize,
}

impl EnrichmentSummary {
    pub fn from_session(summary: &SessionSummary) -> Self {
        Self {
            success_count: summary.ready,
            failed_count: summary.error + summary.loading,
            warning_count: summary.warning,
        }
    }
}

/// Events emitted while a session moves through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Enrichment started for a session
    SessionStarted {
        session_id: String,
        total: usize,
        timestamp: DateTime<Utc>,
    },
    /// A batch enrichment call resolved successfully
    BatchCompleted {
        session_id: String,
        batch_index: usize,
        item_count: usize,
        timestamp: DateTime<Utc>,
    },
    /// A batch enrichment call failed as a whole
    BatchFailed {
        session_id: String,
        batch_index: usize,
        item_count: usize,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// One item settled into the session (stream delivery or retry)
    ItemMerged {
        session_id: String,
        item_id: String,
        status: PreviewStatus,
        timestamp: DateTime<Utc>,
    },
    /// Progress update for the enrichment phase
    Progress(EnrichmentProgress),
    /// All enrichment work for the session has settled
    EnrichmentFinished {
        session_id: String,
        summary: EnrichmentSummary,
        timestamp: DateTime<Utc>,
    },
    /// The stream delivery path lost its connection before the sentinel
    StreamInterrupted {
        session_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// A commit call resolved; carries the full reconciliation outcome
    CommitFinished {
        session_id: String,
        outcome: ReconciliationOutcome,
        timestamp: DateTime<Utc>,
    },
}

impl PipelineEvent {
    /// Stable name for routing/logging
    pub fn event_name(&self) -> &'static str {
        match self {
            PipelineEvent::SessionStarted { .. } => "session-started",
            PipelineEvent::BatchCompleted { .. } => "batch-completed",
            PipelineEvent::BatchFailed { .. } => "batch-failed",
            PipelineEvent::ItemMerged { .. } => "item-merged",
            PipelineEvent::Progress(_) => "progress",
            PipelineEvent::EnrichmentFinished { .. } => "enrichment-finished",
            PipelineEvent::StreamInterrupted { .. } => "stream-interrupted",
            PipelineEvent::CommitFinished { .. } => "commit-finished",
        }
    }
}
