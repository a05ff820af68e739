//! Release enrichment — recent-run cache, single-flight scheduling, and the
//! background back-fill task.
//!
//! A run moves `Unenriched -> EnrichmentRequested -> Enriched`. The remote
//! call is skipped when a run enriched within the cache window exists, and
//! at most one background task holds the enrichment lease at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::config::LogConfig;
use crate::error::{EnrichmentError, StoreError};
use crate::models::run::{EnrichmentState, LogRun, ReleaseInfo};
use crate::services::status_service;
use crate::store::LogStore;

/// Lease name guarding the single in-flight enrichment task.
pub const ENRICHMENT_LEASE: &str = "release-enrichment";

/// Handle to a running background enrichment task.
///
/// Dropping it detaches the task.
#[derive(Debug)]
pub struct EnrichmentJob {
    handle: JoinHandle<Result<usize, EnrichmentError>>,
}

impl EnrichmentJob {
    /// Wait for the task. Returns the number of runs back-filled.
    pub async fn join(self) -> Result<usize, EnrichmentError> {
        self.handle.await?
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// What the scheduler decided for a freshly upserted run.
#[derive(Debug)]
pub enum EnrichmentDecision {
    /// Release copied from a recently enriched run; no remote call.
    CacheHit,
    /// The run already carried release metadata.
    AlreadyEnriched,
    /// Remote lookups are switched off or not configured.
    Disabled,
    /// Another enrichment task holds the lease.
    Declined,
    Scheduled(EnrichmentJob),
}

impl EnrichmentDecision {
    pub fn state(&self) -> EnrichmentState {
        match self {
            EnrichmentDecision::CacheHit | EnrichmentDecision::AlreadyEnriched => {
                EnrichmentState::Enriched
            }
            EnrichmentDecision::Scheduled(_) => EnrichmentState::EnrichmentRequested,
            EnrichmentDecision::Disabled | EnrichmentDecision::Declined => {
                EnrichmentState::Unenriched
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnrichmentDecision::CacheHit => "cache_hit",
            EnrichmentDecision::AlreadyEnriched => "already_enriched",
            EnrichmentDecision::Disabled => "disabled",
            EnrichmentDecision::Declined => "declined",
            EnrichmentDecision::Scheduled(_) => "scheduled",
        }
    }

    pub fn into_job(self) -> Option<EnrichmentJob> {
        match self {
            EnrichmentDecision::Scheduled(job) => Some(job),
            _ => None,
        }
    }
}

/// Midnight UTC of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

/// Oldest creation time a cached run may have: the window, clipped to today.
pub fn cache_cutoff(now: DateTime<Utc>, window: chrono::TimeDelta) -> DateTime<Utc> {
    let midnight = start_of_day(now);
    now.checked_sub_signed(window)
        .map_or(midnight, |cutoff| cutoff.max(midnight))
}

/// Release metadata of the most recent run enriched inside the cache window.
pub async fn find_cached_release(
    store: &dyn LogStore,
    config: &LogConfig,
    now: DateTime<Utc>,
) -> Result<Option<ReleaseInfo>, StoreError> {
    let since = cache_cutoff(now, config.enrichment_window());
    let cached = store.find_recent_enriched_run(since).await?;
    Ok(cached.and_then(|run| run.release()))
}

#[derive(Clone)]
pub struct EnrichmentScheduler {
    store: Arc<dyn LogStore>,
    config: LogConfig,
    client: reqwest::Client,
}

impl EnrichmentScheduler {
    pub fn new(store: Arc<dyn LogStore>, config: LogConfig) -> Self {
        Self {
            store,
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Decide whether `run` needs a remote lookup and, if so, launch it.
    ///
    /// Runs after an upsert that found no cached release. The background task
    /// starts only after the lease is claimed, so concurrent batches cannot
    /// launch a second lookup.
    pub async fn schedule(&self, run: &LogRun) -> EnrichmentDecision {
        if run.is_enriched() {
            return EnrichmentDecision::AlreadyEnriched;
        }
        if !self.config.enrichment_active() {
            return EnrichmentDecision::Disabled;
        }

        let instance_name = if self.config.instance_name.is_empty() {
            run.organization_instance_name.clone().unwrap_or_default()
        } else {
            self.config.instance_name.clone()
        };
        if instance_name.is_empty() {
            tracing::warn!(
                run_id = run.id,
                "No instance name configured or reported, skipping release enrichment"
            );
            return EnrichmentDecision::Disabled;
        }

        let url = match status_service::status_url(&self.config.status_base_url, &instance_name) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(run_id = run.id, "Skipping release enrichment: {e}");
                return EnrichmentDecision::Disabled;
            }
        };

        let holder = uuid::Uuid::new_v4().to_string();
        match self
            .store
            .try_claim_lease(ENRICHMENT_LEASE, &holder, self.config.lease_ttl())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(run_id = run.id, "Enrichment already in flight");
                crate::metrics::enrichment_outcome("declined");
                return EnrichmentDecision::Declined;
            }
            Err(e) => {
                tracing::warn!(run_id = run.id, "Enrichment lease claim failed: {e}");
                crate::metrics::enrichment_outcome("declined");
                return EnrichmentDecision::Declined;
            }
        }

        let store = Arc::clone(&self.store);
        let client = self.client.clone();
        let limit = self.config.store_row_limit;

        tracing::info!(run_id = run.id, url = %url, "Release enrichment scheduled");

        let handle = tokio::spawn(async move {
            let result = run_enrichment(store.as_ref(), &client, url, limit).await;

            match &result {
                Ok(updated) => {
                    crate::metrics::enrichment_outcome("success");
                    tracing::info!(updated, "Release enrichment finished");
                }
                Err(e) => {
                    crate::metrics::enrichment_outcome("failure");
                    tracing::error!("Release enrichment failed: {e}");
                }
            }

            if let Err(e) = store.release_lease(ENRICHMENT_LEASE, &holder).await {
                tracing::warn!("Failed to release enrichment lease: {e}");
            }

            result
        });

        EnrichmentDecision::Scheduled(EnrichmentJob { handle })
    }
}

/// Fetch the current release and write it onto today's unenriched runs.
pub async fn run_enrichment(
    store: &dyn LogStore,
    client: &reqwest::Client,
    url: reqwest::Url,
    limit: i64,
) -> Result<usize, EnrichmentError> {
    let release = status_service::fetch_release(client, url).await?;
    let since = start_of_day(Utc::now());
    let updated = store.backfill_release(since, &release, limit).await?;

    tracing::debug!(
        release_number = %release.release_number,
        release_version = %release.release_version,
        updated,
        "Release back-filled"
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::run::NewLogRun;
    use crate::store::MemoryLogStore;
    use chrono::TimeZone;

    async fn unenriched_run(store: &MemoryLogStore, instance: Option<&str>) -> LogRun {
        store
            .upsert_run(NewLogRun {
                transaction_id: "T1".to_string(),
                organization_instance_name: instance.map(str::to_string),
                ..NewLogRun::default()
            })
            .await
            .unwrap()
    }

    fn active_config() -> LogConfig {
        LogConfig {
            status_base_url: "http://127.0.0.1:9".to_string(),
            ..LogConfig::default()
        }
    }

    #[test]
    fn cutoff_never_crosses_midnight() {
        let early = Utc.with_ymd_and_hms(2026, 3, 1, 1, 30, 0).unwrap();
        assert_eq!(
            cache_cutoff(early, chrono::Duration::hours(4)),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );

        let late = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
        assert_eq!(
            cache_cutoff(late, chrono::Duration::hours(4)),
            Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn cutoff_survives_an_unbounded_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
        assert_eq!(
            cache_cutoff(now, chrono::TimeDelta::MAX),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn cache_ignores_runs_outside_window() {
        let store = MemoryLogStore::new();
        let mut run = NewLogRun {
            transaction_id: "OLD".to_string(),
            ..NewLogRun::default()
        };
        run.apply_release(ReleaseInfo {
            release_number: "57".to_string(),
            release_version: "Winter".to_string(),
        });
        let old = store.upsert_run(run).await.unwrap();
        let now = Utc::now();
        store.set_run_created(old.id, now - chrono::Duration::hours(25));

        let cached = find_cached_release(&store, &LogConfig::default(), now)
            .await
            .unwrap();
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn disabled_without_remote_configuration() {
        let store = Arc::new(MemoryLogStore::new());
        let run = unenriched_run(&store, Some("NA42")).await;
        let scheduler = EnrichmentScheduler::new(store.clone(), LogConfig::default());
        assert!(matches!(scheduler.schedule(&run).await, EnrichmentDecision::Disabled));

        let config = LogConfig {
            enrichment_enabled: false,
            ..active_config()
        };
        let scheduler = EnrichmentScheduler::new(store, config);
        assert!(matches!(scheduler.schedule(&run).await, EnrichmentDecision::Disabled));
    }

    #[tokio::test]
    async fn disabled_without_instance_name() {
        let store = Arc::new(MemoryLogStore::new());
        let run = unenriched_run(&store, None).await;
        let scheduler = EnrichmentScheduler::new(store, active_config());
        assert!(matches!(scheduler.schedule(&run).await, EnrichmentDecision::Disabled));
    }

    #[tokio::test]
    async fn disabled_with_unusable_status_url() {
        let store = Arc::new(MemoryLogStore::new());
        let run = unenriched_run(&store, Some("NA42")).await;
        let config = LogConfig {
            status_base_url: "status.example.com".to_string(),
            ..LogConfig::default()
        };
        let scheduler = EnrichmentScheduler::new(store.clone(), config);
        assert!(matches!(scheduler.schedule(&run).await, EnrichmentDecision::Disabled));

        // No lease was taken
        assert!(store
            .try_claim_lease(ENRICHMENT_LEASE, "next", std::time::Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn declines_while_lease_is_held() {
        let store = Arc::new(MemoryLogStore::new());
        let run = unenriched_run(&store, Some("NA42")).await;
        assert!(store
            .try_claim_lease(ENRICHMENT_LEASE, "other-worker", std::time::Duration::from_secs(60))
            .await
            .unwrap());

        let scheduler = EnrichmentScheduler::new(store, active_config());
        let decision = scheduler.schedule(&run).await;
        assert!(matches!(decision, EnrichmentDecision::Declined));
        assert_eq!(decision.state(), EnrichmentState::Unenriched);
    }

    #[tokio::test]
    async fn failed_task_releases_the_lease() {
        let store = Arc::new(MemoryLogStore::new());
        let run = unenriched_run(&store, Some("NA42")).await;
        let scheduler = EnrichmentScheduler::new(store.clone(), active_config());

        let job = scheduler.schedule(&run).await.into_job().expect("job scheduled");
        // Nothing listens on port 9, so the request fails
        assert!(matches!(job.join().await, Err(EnrichmentError::Request(_))));

        assert!(store
            .try_claim_lease(ENRICHMENT_LEASE, "next", std::time::Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!store.runs()[0].is_enriched());
    }
}
