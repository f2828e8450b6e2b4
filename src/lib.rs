//! relist - bulk listing generation & reconciliation pipeline
//!
//! Takes a batch of externally-sourced marketplace identifiers, drives
//! their enrichment into candidate listing records (batched calls or an
//! incremental event stream), supports human review with non-destructive
//! edits, and reconciles the reviewed set against a listing store with
//! create/update/reactivate/skip/fail semantics.
//!
//! The crate is a library; it is driven by an operator UI that is out of
//! scope here. Typical flow:
//!
//! 1. [`domain::normalize`] pasted text into a validated identifier set
//! 2. seed a [`domain::ReviewSession`] and run either the
//!    [`application::BatchOrchestrator`] or the
//!    [`application::StreamConsumer`]
//! 3. review/edit items through the session
//! 4. commit through the [`application::ReconciliationCommitter`]

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{BatchOrchestrator, EventEmitter, ReconciliationCommitter, StreamConsumer};
pub use domain::{normalize, NormalizePolicy, ReviewSession, TargetSpec};
