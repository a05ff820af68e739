//! Batch ingestion — run, entries, tags, then the enrichment decision.

use std::sync::Arc;
use std::time::Instant;

use crate::config::LogConfig;
use crate::error::IngestError;
use crate::models::entry::LogEntry;
use crate::models::event::RawEvent;
use crate::models::run::LogRun;
use crate::services::enrichment_service::{EnrichmentDecision, EnrichmentScheduler};
use crate::services::tag_service::TagSummary;
use crate::services::{entry_service, run_service, tag_service};
use crate::store::LogStore;

/// Everything written for one batch.
#[derive(Debug)]
pub struct IngestOutcome {
    pub run: LogRun,
    pub entries: Vec<LogEntry>,
    pub tags: TagSummary,
    pub enrichment: EnrichmentDecision,
}

#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn LogStore>,
    config: LogConfig,
    scheduler: EnrichmentScheduler,
}

impl Ingestor {
    pub fn new(store: Arc<dyn LogStore>, config: LogConfig) -> Self {
        let scheduler = EnrichmentScheduler::new(Arc::clone(&store), config.clone());
        Self {
            store,
            config,
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Process one delivered batch to completion.
    ///
    /// A run failure aborts before anything else is written. Entry and tag
    /// failures leave the run persisted. Enrichment runs in the background
    /// and never fails the batch.
    pub async fn process_batch(&self, events: &[RawEvent]) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();
        let result = self.process(events).await;

        crate::metrics::batch_duration(started.elapsed().as_millis() as u64);
        match &result {
            Ok(outcome) => {
                crate::metrics::batch_processed("success");
                tracing::info!(
                    run_id = outcome.run.id,
                    transaction_id = %outcome.run.transaction_id,
                    entry_count = outcome.entries.len(),
                    tag_count = outcome.tags.tag_count,
                    enrichment = outcome.enrichment.label(),
                    "Batch processed"
                );
            }
            Err(e) => {
                crate::metrics::batch_processed("failure");
                tracing::error!(
                    run_id = ?e.persisted_run_id(),
                    "Batch processing failed: {e}"
                );
            }
        }
        result
    }

    async fn process(&self, events: &[RawEvent]) -> Result<IngestOutcome, IngestError> {
        let upsert = run_service::upsert_run(self.store.as_ref(), &self.config, events).await?;
        let run = upsert.run;

        let enrichment = if upsert.cache_hit {
            crate::metrics::enrichment_outcome("cache_hit");
            EnrichmentDecision::CacheHit
        } else {
            self.scheduler.schedule(&run).await
        };

        let normalized = entry_service::normalize_entries(self.store.as_ref(), run.id, events)
            .await
            .map_err(|source| IngestError::Entries {
                run_id: run.id,
                source,
            })?;
        crate::metrics::entries_created(normalized.entries.len());

        let tags = tag_service::reconcile_tags(self.store.as_ref(), run.id, &normalized.tags)
            .await
            .map_err(|source| IngestError::Tags {
                run_id: run.id,
                source,
            })?;

        Ok(IngestOutcome {
            run,
            entries: normalized.entries,
            tags,
            enrichment,
        })
    }
}
