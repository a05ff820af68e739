//! Read API for ingested runs.

use serde::Serialize;

use crate::error::StoreError;
use crate::models::entry::LogEntry;
use crate::models::run::{EnrichmentState, LogRun};
use crate::models::tag::LinkTarget;
use crate::store::LogStore;

/// JSON response for a run with its entries and tags.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunJson {
    #[serde(flatten)]
    pub run: LogRun,
    pub enrichment_state: EnrichmentState,
    pub tags: Vec<String>,
    pub entries: Vec<EntryJson>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryJson {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub tags: Vec<String>,
}

/// Get a run by transaction id with its entries.
pub async fn get_run(
    store: &dyn LogStore,
    transaction_id: &str,
) -> Result<Option<RunJson>, StoreError> {
    let Some(run) = store.find_run_by_transaction(transaction_id).await? else {
        return Ok(None);
    };

    let tags = store.list_tag_names_for(LinkTarget::Run(run.id)).await?;
    let mut entries = Vec::new();
    for entry in store.list_entries(run.id).await? {
        let tags = store.list_tag_names_for(LinkTarget::Entry(entry.id)).await?;
        entries.push(EntryJson { entry, tags });
    }

    let enrichment_state = if run.is_enriched() {
        EnrichmentState::Enriched
    } else {
        EnrichmentState::Unenriched
    };

    Ok(Some(RunJson {
        run,
        enrichment_state,
        tags,
        entries,
    }))
}
