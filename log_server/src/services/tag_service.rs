//! Tag reconciliation — resolve tag names and link them to entries and runs.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::error::StoreError;
use crate::models::tag::{LinkTarget, NewTagLink};
use crate::services::entry_service::TagAccumulator;
use crate::store::LogStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSummary {
    /// Distinct tag names referenced by the batch.
    pub tag_count: usize,
    /// Tags that did not exist before this batch.
    pub tags_created: usize,
    /// Distinct (target, tag) links planned for the batch.
    pub link_count: usize,
    /// Links actually written; lower than `link_count` on re-delivery.
    pub links_created: usize,
}

/// Deduplicated links: each entry to each of its tags, and the run to every
/// tag any of its entries carries.
pub fn plan_links(
    run_id: i64,
    entry_tags: &[(i64, Vec<String>)],
    resolved: &HashMap<String, i64>,
) -> BTreeSet<NewTagLink> {
    let mut links = BTreeSet::new();
    for (entry_id, names) in entry_tags {
        for name in names {
            let Some(&tag_id) = resolved.get(name) else {
                continue;
            };
            links.insert(NewTagLink {
                target: LinkTarget::Entry(*entry_id),
                tag_id,
            });
            links.insert(NewTagLink {
                target: LinkTarget::Run(run_id),
                tag_id,
            });
        }
    }
    links
}

/// Create missing tags and write the batch's links.
pub async fn reconcile_tags(
    store: &dyn LogStore,
    run_id: i64,
    pending: &TagAccumulator,
) -> Result<TagSummary, StoreError> {
    if pending.is_empty() {
        return Ok(TagSummary::default());
    }

    let names = pending.names();
    let mut resolved: HashMap<String, i64> = store
        .find_tags_by_name(&names)
        .await?
        .into_iter()
        .map(|tag| (tag.name, tag.id))
        .collect();

    let missing: Vec<String> = names
        .iter()
        .filter(|name| !resolved.contains_key(*name))
        .cloned()
        .collect();

    let mut tags_created = 0;
    if !missing.is_empty() {
        let created = store.insert_missing_tags(&missing).await?;
        tags_created = created.len();
        resolved.extend(created.into_iter().map(|tag| (tag.name, tag.id)));

        // Names another batch created between our lookup and insert
        let raced: Vec<String> = missing
            .into_iter()
            .filter(|name| !resolved.contains_key(name))
            .collect();
        if !raced.is_empty() {
            resolved.extend(
                store
                    .find_tags_by_name(&raced)
                    .await?
                    .into_iter()
                    .map(|tag| (tag.name, tag.id)),
            );
        }
    }

    for name in names.iter().filter(|name| !resolved.contains_key(*name)) {
        tracing::warn!(run_id, tag = %name, "Tag could not be resolved, skipping its links");
    }

    let links = plan_links(run_id, pending.entry_tags(), &resolved);
    let link_count = links.len();
    let links_created = store.insert_tag_links(links.into_iter().collect()).await?;

    crate::metrics::tags_created(tags_created);
    crate::metrics::tag_links_created(links_created);

    tracing::debug!(
        run_id,
        tag_count = names.len(),
        tags_created,
        link_count,
        links_created,
        "Tags reconciled"
    );

    Ok(TagSummary {
        tag_count: names.len(),
        tags_created,
        link_count,
        links_created,
    })
}
