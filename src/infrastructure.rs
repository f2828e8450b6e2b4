//! Infrastructure layer - external integrations
//!
//! HTTP adapters for the enrichment service and the listing store, the
//! shared rate-limited HTTP client, configuration loading, and logging
//! setup.

pub mod config;
pub mod enrichment_api;
pub mod http_client;
pub mod listing_store_api;
pub mod logging;

pub use config::{AppConfig, ConfigManager};
pub use enrichment_api::HttpEnrichmentService;
pub use http_client::{HttpClient, HttpClientConfig};
pub use listing_store_api::HttpListingStore;
pub use logging::init_logging;
