//! log.enrichment.lease — Single-writer claim for background enrichment.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::log_enrichment_leases;

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = log_enrichment_leases)]
pub struct EnrichmentLease {
    pub name: String,
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EnrichmentLease {
    pub fn new(name: &str, holder: &str, ttl: std::time::Duration) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now
                + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(300)),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
