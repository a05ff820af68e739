//! Run normalization — one upserted run per delivered batch.

use chrono::Utc;

use crate::config::LogConfig;
use crate::error::IngestError;
use crate::models::event::RawEvent;
use crate::models::run::{LogRun, NewLogRun};
use crate::services::enrichment_service;
use crate::store::LogStore;

/// Result of upserting the batch's run.
#[derive(Debug, Clone)]
pub struct RunUpsert {
    pub run: LogRun,
    /// Release metadata was copied from a recently enriched run.
    pub cache_hit: bool,
}

/// Map the batch template event onto the run row.
pub fn build_run(event: &RawEvent) -> NewLogRun {
    NewLogRun {
        transaction_id: event.transaction_id.clone(),
        parent_transaction_id: non_blank(&event.parent_transaction_id),
        logged_by_id: event.logged_by_id.clone(),
        logged_by_username: event.logged_by_username.clone(),
        user_type: event.user_type.clone(),
        profile_id: event.profile_id.clone(),
        profile_name: event.profile_name.clone(),
        user_role_id: event.user_role_id.clone(),
        user_role_name: event.user_role_name.clone(),
        user_license_key: event.user_license_key.clone(),
        locale: event.locale.clone(),
        timezone_id: event.timezone_id.clone(),
        organization_id: event.organization_id.clone(),
        organization_name: event.organization_name.clone(),
        organization_environment_type: event.organization_environment_type.clone(),
        organization_instance_name: event.organization_instance_name.clone(),
        organization_namespace_prefix: event.organization_namespace_prefix.clone(),
        api_version: event.api_version.clone(),
        session_id: event.session_id.clone(),
        session_type: event.session_type.clone(),
        session_security_level: event.session_security_level.clone(),
        login_type: event.login_type.clone(),
        login_history_id: event.login_history_id.clone(),
        login_application: event.login_application.clone(),
        login_platform: event.login_platform.clone(),
        login_browser: event.login_browser.clone(),
        login_domain: event.login_domain.clone(),
        source_ip: event.source_ip.clone(),
        network_id: event.network_id.clone(),
        system_mode: event.system_mode.clone(),
        user_logging_level: event.user_logging_level.clone(),
        release_number: None,
        release_version: None,
        write_date: Some(Utc::now()),
    }
}

/// Upsert the run for `events`, taking run-level fields from the first event.
///
/// Events after the first are not consulted; a batch is assumed to carry one
/// transaction's context.
pub async fn upsert_run(
    store: &dyn LogStore,
    config: &LogConfig,
    events: &[RawEvent],
) -> Result<RunUpsert, IngestError> {
    let template = events.first().ok_or(IngestError::EmptyBatch)?;
    let mut new_run = build_run(template);

    let cached = match enrichment_service::find_cached_release(store, config, Utc::now()).await {
        Ok(cached) => cached,
        Err(e) => {
            tracing::warn!(
                transaction_id = %template.transaction_id,
                "Release cache lookup failed, continuing without it: {e}"
            );
            None
        }
    };
    let cache_hit = cached.is_some();
    if let Some(release) = cached {
        new_run.apply_release(release);
    }

    let run = store
        .upsert_run(new_run)
        .await
        .map_err(|source| IngestError::Run {
            transaction_id: template.transaction_id.clone(),
            source,
        })?;

    tracing::debug!(
        run_id = run.id,
        transaction_id = %run.transaction_id,
        cache_hit,
        "Run upserted"
    );

    Ok(RunUpsert { run, cache_hit })
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::run::ReleaseInfo;
    use crate::store::{MemoryLogStore, StoreOp};

    fn event(transaction_id: &str) -> RawEvent {
        RawEvent {
            transaction_id: transaction_id.to_string(),
            logging_level: "INFO".to_string(),
            logged_by_username: Some("first@example.com".to_string()),
            organization_instance_name: Some("NA42".to_string()),
            ..RawEvent::default()
        }
    }

    #[test]
    fn parent_link_is_set_only_when_declared() {
        let mut child = event("T2");
        child.parent_transaction_id = Some("T1".to_string());
        assert_eq!(build_run(&child).parent_transaction_id.as_deref(), Some("T1"));

        child.parent_transaction_id = Some("   ".to_string());
        assert_eq!(build_run(&child).parent_transaction_id, None);

        assert_eq!(build_run(&event("T3")).parent_transaction_id, None);
    }

    #[tokio::test]
    async fn first_event_is_the_template() {
        let store = MemoryLogStore::new();
        let mut second = event("T1");
        second.logged_by_username = Some("second@example.com".to_string());

        let upsert = upsert_run(&store, &LogConfig::default(), &[event("T1"), second])
            .await
            .unwrap();

        assert_eq!(upsert.run.logged_by_username.as_deref(), Some("first@example.com"));
        assert!(!upsert.cache_hit);
    }

    #[tokio::test]
    async fn reuses_release_from_recent_run() {
        let store = MemoryLogStore::new();
        let mut earlier = build_run(&event("T0"));
        earlier.apply_release(ReleaseInfo {
            release_number: "58".to_string(),
            release_version: "Spring".to_string(),
        });
        store.upsert_run(earlier).await.unwrap();

        let upsert = upsert_run(&store, &LogConfig::default(), &[event("T1")])
            .await
            .unwrap();

        assert!(upsert.cache_hit);
        assert_eq!(upsert.run.release_number.as_deref(), Some("58"));
        assert_eq!(upsert.run.release_version.as_deref(), Some("Spring"));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let store = MemoryLogStore::new();
        let err = upsert_run(&store, &LogConfig::default(), &[]).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyBatch));
    }

    #[tokio::test]
    async fn store_failure_is_fatal() {
        let store = MemoryLogStore::new();
        store.fail_on(StoreOp::UpsertRun);
        let err = upsert_run(&store, &LogConfig::default(), &[event("T1")])
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Run { ref transaction_id, .. } if transaction_id == "T1"));
        assert!(store.runs().is_empty());
    }
}
