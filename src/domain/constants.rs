//! Business policy constants for the listing pipeline
//!
//! These are operational policy values, not protocol limits. Call sites that
//! need configurable values should take them from `AppConfig` rather than
//! reaching for these directly.

/// Working-set size limits for identifier intake
pub mod limits {
    /// Maximum identifiers accepted for an inline bulk-fill run (pasted text)
    pub const INLINE_BULK_MAX: usize = 50;

    /// Maximum identifiers accepted for a catalog-sourced bulk-create run
    pub const CATALOG_BULK_MAX: usize = 80;
}

/// Enrichment dispatch defaults
pub mod enrichment {
    /// Identifiers per enrichment batch call
    pub const DEFAULT_BATCH_SIZE: usize = 10;

    /// Per-call timeout for a batch enrichment request (milliseconds)
    pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

    /// Terminal sentinel payload on the item event stream
    pub const STREAM_DONE_SENTINEL: &str = "[DONE]";
}

/// Derived-SKU generation
pub mod sku {
    /// Prefix for SKU labels derived from source identifiers
    pub const DERIVED_PREFIX: &str = "RL";
}
