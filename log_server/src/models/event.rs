//! Raw log events as delivered by the event feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::entry::GovernorLimits;

/// One delivered log event. Immutable once received.
///
/// Every event in a delivered batch belongs to the same transaction; the
/// run-level fields are expected to be identical across the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEvent {
    pub transaction_id: String,
    pub parent_transaction_id: Option<String>,
    pub transaction_entry_number: Option<i32>,

    // Who logged it
    pub logged_by_id: Option<String>,
    pub logged_by_username: Option<String>,
    pub user_type: Option<String>,
    pub profile_id: Option<String>,
    pub profile_name: Option<String>,
    pub user_role_id: Option<String>,
    pub user_role_name: Option<String>,
    pub user_license_key: Option<String>,
    pub locale: Option<String>,
    pub timezone_id: Option<String>,
    pub user_logging_level: Option<String>,

    // Where it ran
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub organization_environment_type: Option<String>,
    pub organization_instance_name: Option<String>,
    pub organization_namespace_prefix: Option<String>,
    pub api_version: Option<String>,
    pub system_mode: Option<String>,

    // Session and network
    pub session_id: Option<String>,
    pub session_type: Option<String>,
    pub session_security_level: Option<String>,
    pub login_type: Option<String>,
    pub login_history_id: Option<String>,
    pub login_application: Option<String>,
    pub login_platform: Option<String>,
    pub login_browser: Option<String>,
    pub login_domain: Option<String>,
    pub source_ip: Option<String>,
    pub network_id: Option<String>,

    // The entry itself
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

    /// Native timestamp. Loses sub-second precision on some producers.
    pub timestamp: Option<DateTime<Utc>>,
    /// String-encoded timestamp; authoritative when present and parsable.
    pub timestamp_string: Option<String>,

    /// Comma-delimited tag names.
    pub tags: Option<String>,

    #[serde(flatten)]
    pub limits: GovernorLimits,
}
