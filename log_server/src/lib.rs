//! Logbatch — normalizes delivered log event batches into runs, entries and
//! tags, and back-fills release metadata onto runs in the background.
//!
//! A batch flows run upsert -> entry insert -> tag reconciliation, with the
//! enrichment decision taken right after the run upsert.

pub mod config;
pub mod error;
pub mod metrics;
pub mod migration;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

pub use config::LogConfig;
pub use error::{EnrichmentError, IngestError, StoreError};
pub use services::ingest_service::{IngestOutcome, Ingestor};
pub use store::{LogStore, MemoryLogStore, PgLogStore};
