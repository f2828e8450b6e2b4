//! Concurrent batch enrichment orchestration
//!
//! Partitions a validated identifier set into fixed-size batches and
//! dispatches every batch at once. Batches are independent: each one merges
//! its results (or records its failure) into the shared session as it
//! settles, in whatever order the calls resolve. One failed batch never
//! blocks or cancels the others.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::application::events::EventEmitter;
use crate::domain::constants::enrichment;
use crate::domain::events::EnrichmentSummary;
use crate::domain::identifier::Identifier;
use crate::domain::preview::PreviewStatus;
use crate::domain::services::{EnrichmentError, EnrichmentService};
use crate::domain::session::SharedSession;

/// Dispatch parameters for one orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Identifiers per enrichment call; bounds payload size and latency
    pub batch_size: usize,
    /// Upper bound on any single enrichment call
    pub call_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_size: enrichment::DEFAULT_BATCH_SIZE,
            call_timeout: Duration::from_millis(enrichment::DEFAULT_CALL_TIMEOUT_MS),
        }
    }
}

/// Drives the batched request/response enrichment path for one session
pub struct BatchOrchestrator {
    enrichment: Arc<dyn EnrichmentService>,
    emitter: EventEmitter,
    config: OrchestratorConfig,
}

impl BatchOrchestrator {
    pub fn new(
        enrichment: Arc<dyn EnrichmentService>,
        emitter: EventEmitter,
        config: OrchestratorConfig,
    ) -> Self {
        Self { enrichment, emitter, config }
    }

    /// Enrich every identifier in the session, batch by batch, and return
    /// the final per-status summary once all batches have settled.
    pub async fn run(&self, session: &SharedSession) -> EnrichmentSummary {
        let (session_id, target, identifiers) = {
            let guard = session.read().await;
            let ids: Vec<Identifier> =
                guard.items().iter().map(|item| item.identifier.clone()).collect();
            (guard.session_id.clone(), guard.target.clone(), ids)
        };

        let total = identifiers.len();
        self.emitter.emit_session_started(&session_id, total).await;
        info!(session_id = %session_id, total, batch_size = self.config.batch_size,
            "dispatching batched enrichment");

        let batches: Vec<Vec<Identifier>> = identifiers
            .chunks(self.config.batch_size.max(1))
            .map(<[Identifier]>::to_vec)
            .collect();

        let mut handles = Vec::with_capacity(batches.len());
        for (batch_index, batch) in batches.into_iter().enumerate() {
            let enrichment = Arc::clone(&self.enrichment);
            let emitter = self.emitter.clone();
            let session = Arc::clone(session);
            let session_id = session_id.clone();
            let target = target.clone();
            let call_timeout = self.config.call_timeout;

            let batch_ids: Vec<String> =
                batch.iter().map(|id| id.as_str().to_string()).collect();
            let task_ids = batch_ids.clone();
            let handle = tokio::spawn(async move {
                let outcome = timeout(call_timeout, enrichment.enrich_batch(&target, &batch)).await;

                // Merge and progress accounting happen under one write lock
                // so emitted progress values stay monotonic.
                let mut guard = session.write().await;
                match outcome {
                    Ok(Ok(items)) => {
                        for item in items {
                            guard.merge(item);
                        }
                        guard.record_completed(batch.len());
                        emitter
                            .emit_batch_completed(&session_id, batch_index, batch.len())
                            .await;
                    }
                    Ok(Err(error)) => {
                        warn!(session_id = %session_id, batch_index, %error, "batch enrichment failed");
                        guard.mark_failed(&task_ids, &error.to_string());
                        guard.record_completed(batch.len());
                        emitter
                            .emit_batch_failed(&session_id, batch_index, batch.len(), &error.to_string())
                            .await;
                    }
                    Err(_elapsed) => {
                        let error =
                            EnrichmentError::Timeout(call_timeout.as_millis() as u64);
                        warn!(session_id = %session_id, batch_index, %error, "batch enrichment timed out");
                        guard.mark_failed(&task_ids, &error.to_string());
                        guard.record_completed(batch.len());
                        emitter
                            .emit_batch_failed(&session_id, batch_index, batch.len(), &error.to_string())
                            .await;
                    }
                }
                let completed = guard.completed_count();
                let total = guard.len();
                emitter.emit_progress(&session_id, completed, total).await;
            });
            handles.push((handle, batch_ids));
        }

        for (handle, batch_ids) in handles {
            if let Err(join_error) = handle.await {
                // A panicked batch task settles its identifiers as failed
                warn!(session_id = %session_id, %join_error, "batch task aborted");
                let mut guard = session.write().await;
                guard.mark_failed(&batch_ids, "batch task aborted");
                guard.record_completed(batch_ids.len());
            }
        }

        let summary = {
            let guard = session.read().await;
            EnrichmentSummary::from_session(&guard.summary())
        };
        self.emitter.emit_enrichment_finished(&session_id, summary).await;
        info!(session_id = %session_id, success = summary.success_count,
            failed = summary.failed_count, warnings = summary.warning_count,
            "batched enrichment settled");
        summary
    }

    /// Re-invoke enrichment for a single identifier at the operator's
    /// explicit request. Last write wins against anything delivered earlier.
    pub async fn retry_item(
        &self,
        session: &SharedSession,
        item_id: &str,
    ) -> Result<PreviewStatus, EnrichmentError> {
        let (session_id, target, identifier) = {
            let guard = session.read().await;
            let item = guard
                .item(item_id)
                .ok_or_else(|| EnrichmentError::Protocol(format!("unknown item id {item_id}")))?;
            (guard.session_id.clone(), guard.target.clone(), item.identifier.clone())
        };

        let batch = vec![identifier];
        let outcome =
            timeout(self.config.call_timeout, self.enrichment.enrich_batch(&target, &batch)).await;

        let mut guard = session.write().await;
        let status = match outcome {
            Ok(Ok(items)) => {
                let mut status = PreviewStatus::Error;
                for item in items {
                    if item.id == item_id {
                        status = item.status;
                        guard.merge(item);
                    }
                }
                status
            }
            Ok(Err(error)) => {
                guard.mark_failed(&[item_id.to_string()], &error.to_string());
                PreviewStatus::Error
            }
            Err(_elapsed) => {
                let error = EnrichmentError::Timeout(self.config.call_timeout.as_millis() as u64);
                guard.mark_failed(&[item_id.to_string()], &error.to_string());
                PreviewStatus::Error
            }
        };
        self.emitter.emit_item_merged(&session_id, item_id, status).await;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identifier::{normalize, IdentifierKind, NormalizePolicy};
    use crate::domain::preview::test_support::ready_item;
    use crate::domain::preview::PreviewItem;
    use crate::domain::services::StreamEvent;
    use crate::domain::session::{ReviewSession, TargetSpec};
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// Fails the whole call for any batch containing a marked identifier
    struct FlakyEnrichment {
        fail_batches_containing: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EnrichmentService for FlakyEnrichment {
        async fn enrich_batch(
            &self,
            _target: &TargetSpec,
            identifiers: &[Identifier],
        ) -> Result<Vec<PreviewItem>, EnrichmentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if identifiers
                .iter()
                .any(|id| self.fail_batches_containing.contains(&id.as_str().to_string()))
            {
                return Err(EnrichmentError::Transport("connection reset".to_string()));
            }
            Ok(identifiers.iter().map(|id| ready_item(id.as_str())).collect())
        }

        async fn open_stream(
            &self,
            _target: &TargetSpec,
            _identifiers: &[Identifier],
        ) -> Result<BoxStream<'static, Result<StreamEvent, EnrichmentError>>, EnrichmentError>
        {
            unimplemented!("batched tests never open a stream")
        }
    }

    fn session_of(count: usize) -> SharedSession {
        let raws: Vec<String> = (0..count).map(|i| format!("B00EXAMP{i:02}")).collect();
        let policy = NormalizePolicy { kind: IdentifierKind::Asin, max_items: 100 };
        let set = normalize(&raws.join(" "), &policy);
        let target = TargetSpec {
            marketplace: "shopee-sg".to_string(),
            template_id: "default".to_string(),
            defaults: BTreeMap::new(),
        };
        Arc::new(RwLock::new(ReviewSession::new(target, &set.identifiers)))
    }

    #[tokio::test]
    async fn one_failed_batch_does_not_block_the_others() {
        // 25 identifiers, batch size 10: batches of 10/10/5; the second
        // batch (ids 10..19) fails as a whole.
        let session = session_of(25);
        let enrichment = Arc::new(FlakyEnrichment {
            fail_batches_containing: vec!["B00EXAMP15".to_string()],
            calls: AtomicUsize::new(0),
        });
        let orchestrator = BatchOrchestrator::new(
            enrichment.clone(),
            EventEmitter::new(),
            OrchestratorConfig { batch_size: 10, ..Default::default() },
        );

        let summary = orchestrator.run(&session).await;
        assert_eq!(enrichment.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.success_count, 15);
        assert_eq!(summary.failed_count, 10);

        let guard = session.read().await;
        let errored: Vec<&str> = guard
            .items()
            .iter()
            .filter(|item| item.status == PreviewStatus::Error)
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(errored.len(), 10);
        assert!(errored.iter().all(|id| {
            let n: usize = id["B00EXAMP".len()..].parse().unwrap();
            (10..20).contains(&n)
        }));
        assert!(guard
            .item("B00EXAMP12")
            .unwrap()
            .errors
            .iter()
            .any(|message| message.contains("connection reset")));
        assert_eq!(guard.completed_count(), 25);
    }

    #[tokio::test]
    async fn progress_events_are_monotonic() {
        let session = session_of(25);
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();
        let orchestrator = BatchOrchestrator::new(
            Arc::new(FlakyEnrichment {
                fail_batches_containing: vec![],
                calls: AtomicUsize::new(0),
            }),
            emitter,
            OrchestratorConfig { batch_size: 10, ..Default::default() },
        );

        orchestrator.run(&session).await;

        let mut last = 0.0;
        let mut progress_events = 0;
        while let Ok(event) = rx.try_recv() {
            if let crate::domain::events::PipelineEvent::Progress(progress) = event {
                assert!(progress.percentage >= last);
                last = progress.percentage;
                progress_events += 1;
            }
        }
        assert_eq!(progress_events, 3);
        assert!((last - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn retry_item_overwrites_a_failed_item() {
        let session = session_of(1);
        let failing = Arc::new(FlakyEnrichment {
            fail_batches_containing: vec!["B00EXAMP00".to_string()],
            calls: AtomicUsize::new(0),
        });
        let orchestrator = BatchOrchestrator::new(
            failing,
            EventEmitter::new(),
            OrchestratorConfig::default(),
        );
        orchestrator.run(&session).await;
        assert_eq!(
            session.read().await.item("B00EXAMP00").unwrap().status,
            PreviewStatus::Error
        );

        // operator retries against a now-healthy service
        let healthy = Arc::new(FlakyEnrichment {
            fail_batches_containing: vec![],
            calls: AtomicUsize::new(0),
        });
        let orchestrator =
            BatchOrchestrator::new(healthy, EventEmitter::new(), OrchestratorConfig::default());
        let status = orchestrator.retry_item(&session, "B00EXAMP00").await.unwrap();
        assert_eq!(status, PreviewStatus::Ready);
        assert_eq!(
            session.read().await.item("B00EXAMP00").unwrap().status,
            PreviewStatus::Ready
        );
    }
}
