//! Error types for ingestion, storage and enrichment.

use thiserror::Error;

/// Failure of a single store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure while processing one delivered batch.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("batch contains no events")]
    EmptyBatch,

    /// The run upsert failed. Nothing was written for this batch.
    #[error("failed to persist run for transaction {transaction_id}: {source}")]
    Run {
        transaction_id: String,
        #[source]
        source: StoreError,
    },

    /// Entry insert failed. The run stays persisted; re-delivery recovers it.
    #[error("failed to persist entries for run {run_id}: {source}")]
    Entries {
        run_id: i64,
        #[source]
        source: StoreError,
    },

    /// Tag reconciliation failed after entries were written.
    #[error("failed to link tags for run {run_id}: {source}")]
    Tags {
        run_id: i64,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    /// Id of the run left persisted by a partial failure.
    pub fn persisted_run_id(&self) -> Option<i64> {
        match self {
            IngestError::Entries { run_id, .. } | IngestError::Tags { run_id, .. } => {
                Some(*run_id)
            }
            IngestError::EmptyBatch | IngestError::Run { .. } => None,
        }
    }
}

/// Failure of the background release enrichment task.
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("status request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid status URL: {0}")]
    InvalidUrl(String),

    #[error("status endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected status response: {0}")]
    Parse(String),

    #[error("release back-fill failed: {0}")]
    Store(#[from] StoreError),

    #[error("enrichment task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}
