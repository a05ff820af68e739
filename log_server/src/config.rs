//! Ingestion configuration — loaded from environment variables.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct LogConfig {
    /// Scheme and host of the release status service.
    pub status_base_url: String,
    /// Instance name used in the status URL. Falls back to the run's
    /// organization instance when empty.
    pub instance_name: String,
    /// Master switch for the remote release lookup.
    pub enrichment_enabled: bool,
    /// How far back a previously enriched run may be reused, in hours.
    pub enrichment_window_hours: i64,
    /// Maximum rows touched by one back-fill update.
    pub store_row_limit: i64,
    /// Lifetime of the enrichment lease, in seconds.
    pub enrichment_lease_secs: u64,
    /// HMAC secret for intake signature validation.
    pub intake_secret: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            status_base_url: String::new(),
            instance_name: String::new(),
            enrichment_enabled: true,
            enrichment_window_hours: 4,
            store_row_limit: 10_000,
            enrichment_lease_secs: 300,
            intake_secret: String::new(),
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let status_base_url = std::env::var("LOG_STATUS_BASE_URL").unwrap_or_default();
        let instance_name = std::env::var("LOG_INSTANCE_NAME").unwrap_or_default();
        let enrichment_enabled = std::env::var("LOG_ENRICHMENT_ENABLED")
            .ok()
            .and_then(|s| parse_bool(&s))
            .unwrap_or(defaults.enrichment_enabled);
        let enrichment_window_hours = match std::env::var("LOG_ENRICHMENT_WINDOW_HOURS") {
            Ok(raw) => parse_window_hours(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    value = %raw,
                    "LOG_ENRICHMENT_WINDOW_HOURS invalid -- using {}",
                    defaults.enrichment_window_hours
                );
                defaults.enrichment_window_hours
            }),
            Err(_) => defaults.enrichment_window_hours,
        };
        let store_row_limit = std::env::var("LOG_STORE_ROW_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.store_row_limit);
        let enrichment_lease_secs = std::env::var("LOG_ENRICHMENT_LEASE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.enrichment_lease_secs);
        let intake_secret = std::env::var("LOG_INTAKE_SECRET").unwrap_or_default();

        if status_base_url.is_empty() {
            tracing::warn!("LOG_STATUS_BASE_URL not set -- release enrichment disabled");
        }
        if intake_secret.is_empty() {
            tracing::warn!("LOG_INTAKE_SECRET not set -- intake signature validation disabled");
        }

        Self {
            status_base_url,
            instance_name,
            enrichment_enabled,
            enrichment_window_hours,
            store_row_limit,
            enrichment_lease_secs,
            intake_secret,
        }
    }

    /// Whether a remote release lookup may be issued at all.
    pub fn enrichment_active(&self) -> bool {
        self.enrichment_enabled && !self.status_base_url.is_empty()
    }

    /// Cache window, clamped to `0..=MAX_WINDOW_HOURS`.
    pub fn enrichment_window(&self) -> chrono::TimeDelta {
        let hours = self.enrichment_window_hours.clamp(0, MAX_WINDOW_HOURS);
        chrono::TimeDelta::try_hours(hours).unwrap_or(chrono::TimeDelta::zero())
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.enrichment_lease_secs)
    }
}

/// The cache never reaches past midnight, so longer windows change nothing.
pub const MAX_WINDOW_HOURS: i64 = 24;

/// Window hours from the environment. Negative or non-numeric values are
/// rejected; values above a day are clamped.
fn parse_window_hours(value: &str) -> Option<i64> {
    let hours: i64 = value.trim().parse().ok()?;
    if hours < 0 {
        return None;
    }
    Some(hours.min(MAX_WINDOW_HOURS))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrichment_requires_a_status_url() {
        let config = LogConfig::default();
        assert!(config.enrichment_enabled);
        assert!(!config.enrichment_active());

        let config = LogConfig {
            status_base_url: "https://status.example.com".to_string(),
            ..LogConfig::default()
        };
        assert!(config.enrichment_active());

        let config = LogConfig {
            status_base_url: "https://status.example.com".to_string(),
            enrichment_enabled: false,
            ..LogConfig::default()
        };
        assert!(!config.enrichment_active());
    }

    #[test]
    fn parses_boolean_flags() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn window_hours_are_validated() {
        assert_eq!(parse_window_hours("6"), Some(6));
        assert_eq!(parse_window_hours("0"), Some(0));
        assert_eq!(parse_window_hours("9223372036854775807"), Some(MAX_WINDOW_HOURS));
        assert_eq!(parse_window_hours("-3"), None);
        assert_eq!(parse_window_hours("four"), None);
    }

    #[test]
    fn oversized_window_does_not_panic() {
        let config = LogConfig {
            enrichment_window_hours: i64::MAX,
            ..LogConfig::default()
        };
        assert_eq!(config.enrichment_window(), chrono::TimeDelta::hours(24));

        let config = LogConfig {
            enrichment_window_hours: i64::MIN,
            ..LogConfig::default()
        };
        assert_eq!(config.enrichment_window(), chrono::TimeDelta::zero());
    }

    #[test]
    fn default_window_is_four_hours() {
        assert_eq!(LogConfig::default().enrichment_window(), chrono::Duration::hours(4));
    }
}
