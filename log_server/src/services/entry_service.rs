//! Entry normalization — one entry per event, plus the batch's tag names.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::StoreError;
use crate::models::entry::{LogEntry, NewLogEntry};
use crate::models::event::RawEvent;
use crate::store::LogStore;

/// Tag names collected while normalizing one batch.
///
/// Lives for a single batch and is handed to tag reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagAccumulator {
    names: BTreeSet<String>,
    entry_tags: Vec<(i64, Vec<String>)>,
}

impl TagAccumulator {
    pub fn record(&mut self, entry_id: i64, tags: Vec<String>) {
        if tags.is_empty() {
            return;
        }
        self.names.extend(tags.iter().cloned());
        self.entry_tags.push((entry_id, tags));
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Distinct tag names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    /// Tag names per entry id, in entry order.
    pub fn entry_tags(&self) -> &[(i64, Vec<String>)] {
        &self.entry_tags
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedEntries {
    pub entries: Vec<LogEntry>,
    pub tags: TagAccumulator,
}

/// Event timestamp: the string encoding wins when present and parsable.
pub fn resolve_timestamp(event: &RawEvent) -> DateTime<Utc> {
    if let Some(raw) = event.timestamp_string.as_deref().filter(|s| !s.trim().is_empty()) {
        match parse_timestamp(raw) {
            Some(parsed) => return parsed,
            None => tracing::debug!(
                transaction_id = %event.transaction_id,
                timestamp = raw,
                "Unparsable timestamp string, using native timestamp"
            ),
        }
    }
    event.timestamp.unwrap_or_else(Utc::now)
}

/// Parse RFC 3339, or `YYYY-MM-DD HH:MM:SS[.fff]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Split a comma-delimited tag field into distinct, trimmed names.
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn build_entry(run_id: i64, event: &RawEvent) -> NewLogEntry {
    NewLogEntry {
        run_id,
        transaction_entry_number: event.transaction_entry_number,
        logging_level: event.logging_level.clone(),
        logging_level_ordinal: event.logging_level_ordinal,
        message: event.message.clone(),
        message_truncated: event.message_truncated,
        exception_type: event.exception_type.clone(),
        exception_message: event.exception_message.clone(),
        exception_stack_trace: event.exception_stack_trace.clone(),
        stack_trace: event.stack_trace.clone(),
        origin_type: event.origin_type.clone(),
        origin_location: event.origin_location.clone(),
        record_id: event.record_id.clone(),
        record_type: event.record_type.clone(),
        record_json: event.record_json.clone(),
        event_timestamp: resolve_timestamp(event),
        limits: event.limits.clone(),
    }
}

/// Build one entry per event and insert them in a single call.
pub async fn normalize_entries(
    store: &dyn LogStore,
    run_id: i64,
    events: &[RawEvent],
) -> Result<NormalizedEntries, StoreError> {
    let mut new_entries = Vec::with_capacity(events.len());
    let mut tag_lists = Vec::with_capacity(events.len());
    for event in events {
        new_entries.push(build_entry(run_id, event));
        tag_lists.push(split_tags(event.tags.as_deref()));
    }

    let entries = store.insert_entries(new_entries).await?;

    let mut tags = TagAccumulator::default();
    for (entry, names) in entries.iter().zip(tag_lists) {
        tags.record(entry.id, names);
    }

    tracing::debug!(
        run_id,
        entry_count = entries.len(),
        tag_count = tags.names.len(),
        "Entries inserted"
    );

    Ok(NormalizedEntries { entries, tags })
}
