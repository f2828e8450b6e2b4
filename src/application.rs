//! Application layer - pipeline orchestration
//!
//! Drives the domain model: batched and streamed enrichment delivery,
//! commit/reconciliation, and event emission toward operator surfaces.

pub mod committer;
pub mod events;
pub mod orchestrator;
pub mod stream;

pub use committer::ReconciliationCommitter;
pub use events::EventEmitter;
pub use orchestrator::{BatchOrchestrator, OrchestratorConfig};
pub use stream::{StreamConsumer, StreamOutcome};
