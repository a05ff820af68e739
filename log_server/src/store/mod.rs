//! Persistence seam for the ingestion pipeline.
//!
//! [`LogStore`] is the only way the pipeline touches storage. `PgLogStore`
//! is the production backend; `MemoryLogStore` mirrors its semantics in
//! process.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::entry::{LogEntry, NewLogEntry};
use crate::models::run::{LogRun, NewLogRun, ReleaseInfo};
use crate::models::tag::{LinkTarget, NewTagLink, Tag};

pub use memory::{MemoryLogStore, StoreOp};
pub use postgres::PgLogStore;

#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// Insert the run, or update the existing run with the same transaction id.
    async fn upsert_run(&self, run: NewLogRun) -> Result<LogRun, StoreError>;

    async fn find_run_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LogRun>, StoreError>;

    /// Most recently created run at or after `since` that already carries
    /// release metadata.
    async fn find_recent_enriched_run(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<LogRun>, StoreError>;

    /// Insert all entries at once. Returned rows follow the input order.
    async fn insert_entries(&self, entries: Vec<NewLogEntry>) -> Result<Vec<LogEntry>, StoreError>;

    async fn list_entries(&self, run_id: i64) -> Result<Vec<LogEntry>, StoreError>;

    /// Exact, case-sensitive name lookup.
    async fn find_tags_by_name(&self, names: &[String]) -> Result<Vec<Tag>, StoreError>;

    /// Create tags for `names`, skipping names that already exist.
    /// Returns only the tags this call created.
    async fn insert_missing_tags(&self, names: &[String]) -> Result<Vec<Tag>, StoreError>;

    /// Insert links, ignoring ones already present. Returns the number inserted.
    async fn insert_tag_links(&self, links: Vec<NewTagLink>) -> Result<usize, StoreError>;

    /// Tag names linked to `target`, sorted.
    async fn list_tag_names_for(&self, target: LinkTarget) -> Result<Vec<String>, StoreError>;

    /// Claim the named lease for `holder`. Succeeds only when no unexpired
    /// lease of that name exists.
    async fn try_claim_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Drop the lease if `holder` still owns it.
    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), StoreError>;

    /// Write `release` onto unenriched runs created at or after `since`,
    /// oldest first, at most `limit` rows. Returns the number updated.
    async fn backfill_release(
        &self,
        since: DateTime<Utc>,
        release: &ReleaseInfo,
        limit: i64,
    ) -> Result<usize, StoreError>;
}
