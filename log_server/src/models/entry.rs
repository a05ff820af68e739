//! log.entry — One normalized event within a run.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::log_entries;

/// Governor-limit snapshot taken when the event was emitted.
///
/// Each resource carries its ceiling (`*_max`) and consumption (`*_used`).
/// Values are copied through untouched.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Queryable, Selectable, Insertable, Serialize, Deserialize,
)]
#[diesel(table_name = log_entries)]
#[serde(rename_all = "camelCase", default)]
pub struct GovernorLimits {
    pub cpu_time_max: Option<i64>,
    pub cpu_time_used: Option<i64>,
    pub heap_size_max: Option<i64>,
    pub heap_size_used: Option<i64>,
    pub queries_max: Option<i64>,
    pub queries_used: Option<i64>,
    pub query_rows_max: Option<i64>,
    pub query_rows_used: Option<i64>,
    pub dml_statements_max: Option<i64>,
    pub dml_statements_used: Option<i64>,
    pub dml_rows_max: Option<i64>,
    pub dml_rows_used: Option<i64>,
    pub callouts_max: Option<i64>,
    pub callouts_used: Option<i64>,
    pub future_calls_max: Option<i64>,
    pub future_calls_used: Option<i64>,
    pub queueable_jobs_max: Option<i64>,
    pub queueable_jobs_used: Option<i64>,
    pub email_invocations_max: Option<i64>,
    pub email_invocations_used: Option<i64>,
    pub aggregate_queries_max: Option<i64>,
    pub aggregate_queries_used: Option<i64>,
    pub search_queries_max: Option<i64>,
    pub search_queries_used: Option<i64>,
    pub push_notifications_max: Option<i64>,
    pub push_notifications_used: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = log_entries)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub run_id: i64,
    pub transaction_entry_number: Option<i32>,
    pub logging_level: String,
    pub logging_level_ordinal: Option<i32>,
    pub message: Option<String>,
    pub message_truncated: bool,
    pub exception_type: Option<String>,
    pub exception_message: Option<String>,
    pub exception_stack_trace: Option<String>,
    pub stack_trace: Option<String>,
    pub origin_type: Option<String>,
    pub origin_location: Option<String>,
    pub record_id: Option<String>,
    pub record_type: Option<String>,
    pub record_json: Option<String>,
    pub event_timestamp: DateTime<Utc>,
    #[diesel(embed)]
    pub limits: GovernorLimits,
    pub create_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = log_entries)]
pub struct NewLogEntry {
    pub run_id: i64,
    pub transaction_entry_number: Option<i32>,
    pub logging_level: String,
    pub logging_level_ordinal: Option<i32>,
    pub message: Option<String>,
    pub message_truncated: bool,
    pub exception_type: Option<String>,
    pub exception_message: Option<String>,
    pub exception_stack_trace: Option<String>,
    pub stack_trace: Option<String>,
    pub origin_type: Option<String>,
    pub origin_location: Option<String>,
    pub record_id: Option<String>,
    pub record_type: Option<String>,
    pub record_json: Option<String>,
    pub event_timestamp: DateTime<Utc>,
    #[diesel(embed)]
    pub limits: GovernorLimits,
}
