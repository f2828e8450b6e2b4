//! Event emission for real-time operator surfaces
//!
//! Centralized fan-out of pipeline events. The pipeline never talks to a UI
//! directly; it publishes `PipelineEvent`s here and any number of
//! subscribers (an operator UI bridge, a test harness) consume them from a
//! broadcast channel.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::domain::events::{EnrichmentProgress, EnrichmentSummary, PipelineEvent};
use crate::domain::outcome::ReconciliationOutcome;
use crate::domain::preview::PreviewStatus;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast-backed emitter for pipeline events
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<PipelineEvent>,
    /// Whether event emission is enabled
    enabled: Arc<RwLock<bool>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, enabled: Arc::new(RwLock::new(true)) }
    }

    /// Subscribe to the event feed; each subscriber gets every event from
    /// its subscription point forward
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Enable or disable event emission
    pub async fn set_enabled(&self, enabled: bool) {
        let mut guard = self.enabled.write().await;
        *guard = enabled;
        debug!("event emission {}", if enabled { "enabled" } else { "disabled" });
    }

    pub async fn is_enabled(&self) -> bool {
        *self.enabled.read().await
    }

    /// Emit a pipeline event. A send error only means there are currently
    /// no subscribers, which is fine for a headless run.
    pub async fn emit(&self, event: PipelineEvent) {
        if !self.is_enabled().await {
            return;
        }
        let name = event.event_name();
        match self.tx.send(event) {
            Ok(receivers) => debug!(event = name, receivers, "emitted pipeline event"),
            Err(_) => debug!(event = name, "no subscribers for pipeline event"),
        }
    }

    pub async fn emit_progress(&self, session_id: &str, completed: usize, total: usize) {
        let percentage =
            if total == 0 { 0.0 } else { completed as f64 / total as f64 * 100.0 };
        self.emit(PipelineEvent::Progress(EnrichmentProgress {
            session_id: session_id.to_string(),
            completed,
            total,
            percentage,
        }))
        .await;
    }

    pub async fn emit_session_started(&self, session_id: &str, total: usize) {
        self.emit(PipelineEvent::SessionStarted {
            session_id: session_id.to_string(),
            total,
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn emit_batch_completed(&self, session_id: &str, batch_index: usize, item_count: usize) {
        self.emit(PipelineEvent::BatchCompleted {
            session_id: session_id.to_string(),
            batch_index,
            item_count,
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn emit_batch_failed(
        &self,
        session_id: &str,
        batch_index: usize,
        item_count: usize,
        message: &str,
    ) {
        self.emit(PipelineEvent::BatchFailed {
            session_id: session_id.to_string(),
            batch_index,
            item_count,
            message: message.to_string(),
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn emit_item_merged(&self, session_id: &str, item_id: &str, status: PreviewStatus) {
        self.emit(PipelineEvent::ItemMerged {
            session_id: session_id.to_string(),
            item_id: item_id.to_string(),
            status,
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn emit_enrichment_finished(&self, session_id: &str, summary: EnrichmentSummary) {
        self.emit(PipelineEvent::EnrichmentFinished {
            session_id: session_id.to_string(),
            summary,
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn emit_stream_interrupted(&self, session_id: &str, message: &str) {
        self.emit(PipelineEvent::StreamInterrupted {
            session_id: session_id.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        })
        .await;
    }

    pub async fn emit_commit_finished(&self, session_id: &str, outcome: ReconciliationOutcome) {
        self.emit(PipelineEvent::CommitFinished {
            session_id: session_id.to_string(),
            outcome,
            timestamp: Utc::now(),
        })
        .await;
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}
