//! log.run — The aggregate record shared by every event of one transaction.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::log_runs;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = log_runs)]
#[serde(rename_all = "camelCase")]
pub struct LogRun {
    pub id: i64,
    pub transaction_id: String,
    /// Weak link to the parent transaction's run. The parent may not exist.
    pub parent_transaction_id: Option<String>,
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
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub organization_environment_type: Option<String>,
    pub organization_instance_name: Option<String>,
    pub organization_namespace_prefix: Option<String>,
    pub api_version: Option<String>,
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
    pub system_mode: Option<String>,
    pub user_logging_level: Option<String>,
    pub release_number: Option<String>,
    pub release_version: Option<String>,
    pub create_date: DateTime<Utc>,
    pub write_date: Option<DateTime<Utc>>,
}

impl LogRun {
    /// Release metadata, if both fields have been back-filled.
    pub fn release(&self) -> Option<ReleaseInfo> {
        match (&self.release_number, &self.release_version) {
            (Some(number), Some(version)) => Some(ReleaseInfo {
                release_number: number.clone(),
                release_version: version.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.release_number.is_some()
    }
}

/// Insert/upsert shape. `None` columns are left untouched on conflict, so
/// re-delivery never clears release values that were already back-filled.
#[derive(Debug, Clone, Default, Insertable, AsChangeset)]
#[diesel(table_name = log_runs)]
pub struct NewLogRun {
    pub transaction_id: String,
    pub parent_transaction_id: Option<String>,
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
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
    pub organization_environment_type: Option<String>,
    pub organization_instance_name: Option<String>,
    pub organization_namespace_prefix: Option<String>,
    pub api_version: Option<String>,
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
    pub system_mode: Option<String>,
    pub user_logging_level: Option<String>,
    pub release_number: Option<String>,
    pub release_version: Option<String>,
    pub write_date: Option<DateTime<Utc>>,
}

impl NewLogRun {
    pub fn apply_release(&mut self, release: ReleaseInfo) {
        self.release_number = Some(release.release_number);
        self.release_version = Some(release.release_version);
    }
}

/// Release metadata returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    pub release_number: String,
    pub release_version: String,
}

/// Where a run sits in the enrichment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentState {
    Unenriched,
    EnrichmentRequested,
    Enriched,
}
