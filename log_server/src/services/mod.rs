//! Ingestion services — the pipeline stages and their collaborators.

pub mod enrichment_service;
pub mod entry_service;
pub mod ingest_service;
pub mod intake_service;
pub mod run_service;
pub mod status_service;
pub mod tag_service;
