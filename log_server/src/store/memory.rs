//! In-process [`LogStore`] with the same key and ordering rules as Postgres.
//!
//! Used by tests and by `logbatch --memory`. Individual operations can be
//! made to fail to exercise partial-failure handling.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::entry::{LogEntry, NewLogEntry};
use crate::models::lease::EnrichmentLease;
use crate::models::run::{LogRun, NewLogRun, ReleaseInfo};
use crate::models::tag::{LinkTarget, NewTagLink, Tag, TagLink};
use crate::store::LogStore;

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    UpsertRun,
    InsertEntries,
    InsertTags,
    InsertTagLinks,
    Backfill,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    runs: Vec<LogRun>,
    entries: Vec<LogEntry>,
    tags: Vec<Tag>,
    links: Vec<TagLink>,
    leases: HashMap<String, EnrichmentLease>,
    failures: HashSet<StoreOp>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failures.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} failed")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLogStore {
    state: Mutex<MemoryState>,
}

macro_rules! merge_some {
    ($existing:expr, $incoming:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $incoming.$field {
                $existing.$field = Some(value);
            }
        )+
    };
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail.
    pub fn fail_on(&self, op: StoreOp) {
        self.lock().failures.insert(op);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn runs(&self) -> Vec<LogRun> {
        self.lock().runs.clone()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.lock().tags.clone()
    }

    pub fn tag_links(&self) -> Vec<TagLink> {
        self.lock().links.clone()
    }

    /// Rewrite a run's creation time.
    pub fn set_run_created(&self, run_id: i64, create_date: DateTime<Utc>) {
        let mut state = self.lock();
        if let Some(run) = state.runs.iter_mut().find(|r| r.id == run_id) {
            run.create_date = create_date;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-operation
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn new_run_row(id: i64, run: NewLogRun, now: DateTime<Utc>) -> LogRun {
    LogRun {
        id,
        transaction_id: run.transaction_id,
        parent_transaction_id: run.parent_transaction_id,
        logged_by_id: run.logged_by_id,
        logged_by_username: run.logged_by_username,
        user_type: run.user_type,
        profile_id: run.profile_id,
        profile_name: run.profile_name,
        user_role_id: run.user_role_id,
        user_role_name: run.user_role_name,
        user_license_key: run.user_license_key,
        locale: run.locale,
        timezone_id: run.timezone_id,
        organization_id: run.organization_id,
        organization_name: run.organization_name,
        organization_environment_type: run.organization_environment_type,
        organization_instance_name: run.organization_instance_name,
        organization_namespace_prefix: run.organization_namespace_prefix,
        api_version: run.api_version,
        session_id: run.session_id,
        session_type: run.session_type,
        session_security_level: run.session_security_level,
        login_type: run.login_type,
        login_history_id: run.login_history_id,
        login_application: run.login_application,
        login_platform: run.login_platform,
        login_browser: run.login_browser,
        login_domain: run.login_domain,
        source_ip: run.source_ip,
        network_id: run.network_id,
        system_mode: run.system_mode,
        user_logging_level: run.user_logging_level,
        release_number: run.release_number,
        release_version: run.release_version,
        create_date: now,
        write_date: run.write_date.or(Some(now)),
    }
}

fn new_entry_row(id: i64, entry: NewLogEntry, now: DateTime<Utc>) -> LogEntry {
    LogEntry {
        id,
        run_id: entry.run_id,
        transaction_entry_number: entry.transaction_entry_number,
        logging_level: entry.logging_level,
        logging_level_ordinal: entry.logging_level_ordinal,
        message: entry.message,
        message_truncated: entry.message_truncated,
        exception_type: entry.exception_type,
        exception_message: entry.exception_message,
        exception_stack_trace: entry.exception_stack_trace,
        stack_trace: entry.stack_trace,
        origin_type: entry.origin_type,
        origin_location: entry.origin_location,
        record_id: entry.record_id,
        record_type: entry.record_type,
        record_json: entry.record_json,
        event_timestamp: entry.event_timestamp,
        limits: entry.limits,
        create_date: now,
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn upsert_run(&self, run: NewLogRun) -> Result<LogRun, StoreError> {
        let mut state = self.lock();
        state.check(StoreOp::UpsertRun)?;
        let now = Utc::now();

        if let Some(existing) = state
            .runs
            .iter_mut()
            .find(|r| r.transaction_id == run.transaction_id)
        {
            merge_some!(
                existing,
                run,
                parent_transaction_id,
                logged_by_id,
                logged_by_username,
                user_type,
                profile_id,
                profile_name,
                user_role_id,
                user_role_name,
                user_license_key,
                locale,
                timezone_id,
                organization_id,
                organization_name,
                organization_environment_type,
                organization_instance_name,
                organization_namespace_prefix,
                api_version,
                session_id,
                session_type,
                session_security_level,
                login_type,
                login_history_id,
                login_application,
                login_platform,
                login_browser,
                login_domain,
                source_ip,
                network_id,
                system_mode,
                user_logging_level,
                release_number,
                release_version,
                write_date,
            );
            return Ok(existing.clone());
        }

        let id = state.next_id();
        let row = new_run_row(id, run, now);
        state.runs.push(row.clone());
        Ok(row)
    }

    async fn find_run_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<LogRun>, StoreError> {
        let state = self.lock();
        Ok(state
            .runs
            .iter()
            .find(|r| r.transaction_id == transaction_id)
            .cloned())
    }

    async fn find_recent_enriched_run(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<LogRun>, StoreError> {
        let state = self.lock();
        Ok(state
            .runs
            .iter()
            .filter(|r| r.create_date >= since && r.release().is_some())
            .max_by_key(|r| (r.create_date, r.id))
            .cloned())
    }

    async fn insert_entries(&self, entries: Vec<NewLogEntry>) -> Result<Vec<LogEntry>, StoreError> {
        let mut state = self.lock();
        state.check(StoreOp::InsertEntries)?;

        if let Some(orphan) = entries
            .iter()
            .find(|e| !state.runs.iter().any(|r| r.id == e.run_id))
        {
            return Err(StoreError::Unavailable(format!(
                "run {} does not exist",
                orphan.run_id
            )));
        }

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = state.next_id();
            inserted.push(new_entry_row(id, entry, now));
        }
        state.entries.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn list_entries(&self, run_id: i64) -> Result<Vec<LogEntry>, StoreError> {
        let state = self.lock();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn find_tags_by_name(&self, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        let state = self.lock();
        Ok(state
            .tags
            .iter()
            .filter(|t| names.contains(&t.name))
            .cloned()
            .collect())
    }

    async fn insert_missing_tags(&self, names: &[String]) -> Result<Vec<Tag>, StoreError> {
        let mut state = self.lock();
        state.check(StoreOp::InsertTags)?;

        let now = Utc::now();
        let mut created = Vec::new();
        for name in names {
            if state.tags.iter().any(|t| &t.name == name) {
                continue;
            }
            let id = state.next_id();
            let tag = Tag {
                id,
                name: name.clone(),
                create_date: now,
            };
            state.tags.push(tag.clone());
            created.push(tag);
        }
        Ok(created)
    }

    async fn insert_tag_links(&self, links: Vec<NewTagLink>) -> Result<usize, StoreError> {
        let mut state = self.lock();
        state.check(StoreOp::InsertTagLinks)?;

        if let Some(dangling) = links
            .iter()
            .find(|l| !state.tags.iter().any(|t| t.id == l.tag_id))
        {
            return Err(StoreError::Unavailable(format!(
                "tag {} does not exist",
                dangling.tag_id
            )));
        }

        let now = Utc::now();
        let mut inserted = 0;
        for link in links {
            let exists = state.links.iter().any(|l| {
                l.target_kind == link.target.kind()
                    && l.target_id == link.target.id()
                    && l.tag_id == link.tag_id
            });
            if exists {
                continue;
            }
            let id = state.next_id();
            state.links.push(TagLink {
                id,
                target_kind: link.target.kind().to_string(),
                target_id: link.target.id(),
                tag_id: link.tag_id,
                create_date: now,
            });
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn list_tag_names_for(&self, target: LinkTarget) -> Result<Vec<String>, StoreError> {
        let state = self.lock();
        let names: BTreeSet<String> = state
            .links
            .iter()
            .filter(|l| l.target_kind == target.kind() && l.target_id == target.id())
            .filter_map(|l| state.tags.iter().find(|t| t.id == l.tag_id))
            .map(|t| t.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn try_claim_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if let Some(current) = state.leases.get(name) {
            if !current.is_expired() {
                return Ok(false);
            }
        }
        state
            .leases
            .insert(name.to_string(), EnrichmentLease::new(name, holder, ttl));
        Ok(true)
    }

    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.leases.get(name).is_some_and(|l| l.holder == holder) {
            state.leases.remove(name);
        }
        Ok(())
    }

    async fn backfill_release(
        &self,
        since: DateTime<Utc>,
        release: &ReleaseInfo,
        limit: i64,
    ) -> Result<usize, StoreError> {
        let mut state = self.lock();
        state.check(StoreOp::Backfill)?;

        let mut pending: Vec<(DateTime<Utc>, i64)> = state
            .runs
            .iter()
            .filter(|r| r.create_date >= since && r.release_number.is_none())
            .map(|r| (r.create_date, r.id))
            .collect();
        pending.sort();
        pending.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));

        let now = Utc::now();
        let mut updated = 0;
        for (_, id) in pending {
            if let Some(run) = state.runs.iter_mut().find(|r| r.id == id) {
                run.release_number = Some(release.release_number.clone());
                run.release_version = Some(release.release_version.clone());
                run.write_date = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }
}
