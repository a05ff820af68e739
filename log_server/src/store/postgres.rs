//! PostgreSQL-backed [`LogStore`] using diesel-async over a deadpool pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::error::StoreError;
use crate::models::entry::{LogEntry, NewLogEntry};
use crate::models::lease::EnrichmentLease;
use crate::models::run::{LogRun, NewLogRun, ReleaseInfo};
use crate::models::tag::{LinkTarget, NewTag, NewTagLink, Tag, TagLinkRow};
use crate::schema::{log_enrichment_leases, log_entries, log_runs, log_tag_links, log_tags};
use crate::store::LogStore;

pub type PgPool = Pool<AsyncPgConnection>;

/// Postgres rejects statements with more bind parameters than this.
const MAX_BIND_PARAMS: usize = 65_535;
/// Upper bound on binds per `log_entries` row (one per column).
const ENTRY_BINDS_PER_ROW: usize = 44;
/// Binds per `TagLinkRow`.
const LINK_BINDS_PER_ROW: usize = 3;

/// Rows that fit in one multi-row INSERT.
fn rows_per_statement(binds_per_row: usize) -> usize {
    (MAX_BIND_PARAMS / binds_per_row.max(1)).max(1)
}

#[derive(Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    /// Build a pool for `database_url`. Connections are opened lazily.
    pub fn connect(database_url: &str, max_size: usize) -> Result<Self, StoreError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_size)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn upsert_run(&self, run: NewLogRun) -> Result<LogRun, StoreError> {
        let mut conn = self.conn().await?;
        let result = diesel::insert_into(log_runs::table)
            .values(&run)
            .on_conflict(log_runs::transaction_id)
            .do_update()
            .set(&run)
            .returning(LogRun::as_returning())
            .get_result(&mut *conn)
            .await?;
        Ok(result)
    }

    async fn find_run_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LogRun>, StoreError> {
        let mut conn = self.conn().await?;
        let result = log_runs::table
            .filter(log_runs::transaction_id.eq(transaction_id))
            .select(LogRun::as_select())
            .first(&mut *conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn find_recent_enriched_run(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<LogRun>, StoreError> {
        let mut conn = self.conn().await?;
        let result = log_runs::table
            .filter(log_runs::create_date.ge(since))
            .filter(log_runs::release_number.is_not_null())
            .filter(log_runs::release_version.is_not_null())
            .order((log_runs::create_date.desc(), log_runs::id.desc()))
            .select(LogRun::as_select())
            .first(&mut *conn)
            .await
            .optional()?;
        Ok(result)
    }

    async fn insert_entries(&self, entries: Vec<NewLogEntry>) -> Result<Vec<LogEntry>, StoreError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;

        // All chunks commit together so a batch is never half written
        let results = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let mut inserted = Vec::with_capacity(entries.len());
                    for chunk in entries.chunks(rows_per_statement(ENTRY_BINDS_PER_ROW)) {
                        let rows: Vec<LogEntry> = diesel::insert_into(log_entries::table)
                            .values(chunk)
                            .returning(LogEntry::as_returning())
                            .get_results(conn)
                            .await?;
                        inserted.extend(rows);
                    }
                    Ok(inserted)
                }
                .scope_boxed()
            })
            .await?;
        Ok(results)
    }

    async fn list_entries(&self, run_id: i64) -> Result<Vec<LogEntry>, StoreError> {
        let mut conn = self.conn().await?;
        let results = log_entries::table
            .filter(log_entries::run_id.eq(run_id))
            .order(log_entries::id.asc())
            .select(LogEntry::as_select())
            .load(&mut *conn)
            .await?;
        Ok(results)
    }

    async fn find_tags_by_name(&self, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let results = log_tags::table
            .filter(log_tags::name.eq_any(names))
            .select(Tag::as_select())
            .load(&mut *conn)
            .await?;
        Ok(results)
    }

    async fn insert_missing_tags(&self, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<NewTag<'_>> = names.iter().map(|name| NewTag { name }).collect();
        let mut conn = self.conn().await?;
        let created = diesel::insert_into(log_tags::table)
            .values(&rows)
            .on_conflict(log_tags::name)
            .do_nothing()
            .returning(Tag::as_returning())
            .get_results(&mut *conn)
            .await?;
        Ok(created)
    }

    async fn insert_tag_links(&self, links: Vec<NewTagLink>) -> Result<usize, StoreError> {
        if links.is_empty() {
            return Ok(0);
        }
        let rows: Vec<TagLinkRow> = links.into_iter().map(TagLinkRow::from).collect();
        let mut conn = self.conn().await?;
        let inserted = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let mut inserted = 0;
                    for chunk in rows.chunks(rows_per_statement(LINK_BINDS_PER_ROW)) {
                        inserted += diesel::insert_into(log_tag_links::table)
                            .values(chunk)
                            .on_conflict((
                                log_tag_links::target_kind,
                                log_tag_links::target_id,
                                log_tag_links::tag_id,
                            ))
                            .do_nothing()
                            .execute(conn)
                            .await?;
                    }
                    Ok(inserted)
                }
                .scope_boxed()
            })
            .await?;
        Ok(inserted)
    }

    async fn list_tag_names_for(&self, target: LinkTarget) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn().await?;
        let names = log_tag_links::table
            .inner_join(log_tags::table)
            .filter(log_tag_links::target_kind.eq(target.kind()))
            .filter(log_tag_links::target_id.eq(target.id()))
            .order(log_tags::name.asc())
            .select(log_tags::name)
            .load::<String>(&mut *conn)
            .await?;
        Ok(names)
    }

    async fn try_claim_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn().await?;

        // Clear a lease abandoned past its expiry so it can be reclaimed
        diesel::delete(
            log_enrichment_leases::table
                .filter(log_enrichment_leases::name.eq(name))
                .filter(log_enrichment_leases::expires_at.le(Utc::now())),
        )
        .execute(&mut *conn)
        .await?;

        // The primary key arbitrates between concurrent claimers
        let lease = EnrichmentLease::new(name, holder, ttl);
        let inserted = diesel::insert_into(log_enrichment_leases::table)
            .values(&lease)
            .on_conflict_do_nothing()
            .execute(&mut *conn)
            .await?;

        Ok(inserted == 1)
    }

    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        diesel::delete(
            log_enrichment_leases::table
                .filter(log_enrichment_leases::name.eq(name))
                .filter(log_enrichment_leases::holder.eq(holder)),
        )
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn backfill_release(
        &self,
        since: DateTime<Utc>,
        release: &ReleaseInfo,
        limit: i64,
    ) -> Result<usize, StoreError> {
        let mut conn = self.conn().await?;

        let updated = conn
            .transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    let oldest_unenriched: Vec<i64> = log_runs::table
                        .filter(log_runs::create_date.ge(since))
                        .filter(log_runs::release_number.is_null())
                        .order((log_runs::create_date.asc(), log_runs::id.asc()))
                        .limit(limit)
                        .select(log_runs::id)
                        .load(conn)
                        .await?;
                    if oldest_unenriched.is_empty() {
                        return Ok(0);
                    }

                    // Re-check the null so a concurrent back-fill is never overwritten
                    diesel::update(
                        log_runs::table
                            .filter(log_runs::id.eq_any(oldest_unenriched))
                            .filter(log_runs::release_number.is_null()),
                    )
                    .set((
                        log_runs::release_number.eq(&release.release_number),
                        log_runs::release_version.eq(&release.release_version),
                        log_runs::write_date.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await
                }
                .scope_boxed()
            })
            .await?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_stay_under_the_bind_limit() {
        let entry_rows = rows_per_statement(ENTRY_BINDS_PER_ROW);
        assert!(entry_rows * ENTRY_BINDS_PER_ROW <= MAX_BIND_PARAMS);
        assert_eq!(entry_rows, 1_489);

        let link_rows = rows_per_statement(LINK_BINDS_PER_ROW);
        assert!(link_rows * LINK_BINDS_PER_ROW <= MAX_BIND_PARAMS);
        assert_eq!(rows_per_statement(0), MAX_BIND_PARAMS);
    }

    #[test]
    fn a_large_batch_needs_several_statements() {
        let chunks = (0..1_600).collect::<Vec<_>>();
        let count = chunks.chunks(rows_per_statement(ENTRY_BINDS_PER_ROW)).count();
        assert_eq!(count, 2);
    }
}
