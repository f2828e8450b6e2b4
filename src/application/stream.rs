//! Incremental enrichment delivery over a long-lived event stream
//!
//! The alternative to the batched path, used when identifiers come from an
//! existing catalog. The session is seeded with placeholders first, then a
//! single stream is opened and consumed until the terminal sentinel, a
//! connection error, or operator cancellation. The session owns the
//! stream's cancellation handle, so tearing down the review always closes
//! the connection.

use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::events::EventEmitter;
use crate::domain::events::EnrichmentSummary;
use crate::domain::identifier::Identifier;
use crate::domain::services::{EnrichmentError, EnrichmentService, StreamEvent};
use crate::domain::session::SharedSession;

/// How a stream consumption run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Terminal sentinel received; every event the server had was delivered
    Completed,
    /// Operator cancelled (review closed) before the sentinel
    Cancelled,
    /// Connection error or premature end of stream
    Interrupted,
}

/// Consumes one enrichment event stream into the shared session
pub struct StreamConsumer {
    enrichment: Arc<dyn EnrichmentService>,
    emitter: EventEmitter,
}

impl StreamConsumer {
    pub fn new(enrichment: Arc<dyn EnrichmentService>, emitter: EventEmitter) -> Self {
        Self { enrichment, emitter }
    }

    /// Open the stream for the session's identifiers and consume it to a
    /// terminal condition. Still-loading items are annotated as failed when
    /// the stream dies early; there is no automatic reconnect.
    pub async fn run(&self, session: &SharedSession) -> Result<StreamOutcome, EnrichmentError> {
        let (session_id, target, identifiers, cancel) = {
            let mut guard = session.write().await;
            let ids: Vec<Identifier> =
                guard.items().iter().map(|item| item.identifier.clone()).collect();
            let token = CancellationToken::new();
            guard.attach_stream(token.clone());
            (guard.session_id.clone(), guard.target.clone(), ids, token)
        };

        let total = identifiers.len();
        self.emitter.emit_session_started(&session_id, total).await;

        let mut stream = match self.enrichment.open_stream(&target, &identifiers).await {
            Ok(stream) => stream,
            Err(error) => {
                self.fail_remaining(session, &session_id, &error.to_string()).await;
                session.write().await.detach_stream();
                return Err(error);
            }
        };
        info!(session_id = %session_id, total, "enrichment stream opened");

        let outcome = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(session_id = %session_id, "stream cancelled by session teardown");
                    break StreamOutcome::Cancelled;
                }
                event = stream.next() => match event {
                    Some(Ok(StreamEvent::Item { item })) => {
                        let (item_id, status, completed) = {
                            let mut guard = session.write().await;
                            let merged = guard.merge(item.clone());
                            if merged {
                                guard.record_completed(1);
                            }
                            (item.id, item.status, guard.completed_count())
                        };
                        self.emitter.emit_item_merged(&session_id, &item_id, status).await;
                        self.emitter.emit_progress(&session_id, completed, total).await;
                    }
                    Some(Ok(StreamEvent::Done)) => {
                        info!(session_id = %session_id, "stream delivered terminal sentinel");
                        break StreamOutcome::Completed;
                    }
                    Some(Err(error)) => {
                        warn!(session_id = %session_id, %error, "stream connection error");
                        self.fail_remaining(session, &session_id, "enrichment stream connection lost").await;
                        break StreamOutcome::Interrupted;
                    }
                    None => {
                        // end of stream without the sentinel: same handling
                        // as a connection error
                        warn!(session_id = %session_id, "stream ended without terminal sentinel");
                        self.fail_remaining(session, &session_id, "enrichment stream ended unexpectedly").await;
                        break StreamOutcome::Interrupted;
                    }
                }
            }
        };

        // Dropping the stream closes the underlying connection; the handle
        // in the session is cleared either way.
        drop(stream);
        session.write().await.detach_stream();

        if outcome == StreamOutcome::Completed {
            let summary = {
                let guard = session.read().await;
                EnrichmentSummary::from_session(&guard.summary())
            };
            self.emitter.emit_enrichment_finished(&session_id, summary).await;
        }
        Ok(outcome)
    }

    /// Annotate every still-loading item as failed with `message`
    async fn fail_remaining(&self, session: &SharedSession, session_id: &str, message: &str) {
        let mut guard = session.write().await;
        let pending: Vec<String> = guard
            .items()
            .iter()
            .filter(|item| item.status == crate::domain::preview::PreviewStatus::Loading)
            .map(|item| item.id.clone())
            .collect();
        if pending.is_empty() {
            return;
        }
        let count = pending.len();
        guard.mark_failed(&pending, message);
        guard.record_completed(count);
        drop(guard);
        self.emitter.emit_stream_interrupted(session_id, message).await;
    }
}
