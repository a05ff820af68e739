//! Schema migration for the log ingestion tables.

use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;

/// SQL migration for log ingestion tables.
///
/// Idempotent: every statement is guarded with `IF NOT EXISTS`.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Log runs (one per transaction)
-- ================================================================

CREATE TABLE IF NOT EXISTS log_runs (
    id                              BIGSERIAL PRIMARY KEY,
    transaction_id                  VARCHAR(255) NOT NULL UNIQUE,
    parent_transaction_id           VARCHAR(255),
    logged_by_id                    VARCHAR(64),
    logged_by_username              VARCHAR(255),
    user_type                       VARCHAR(64),
    profile_id                      VARCHAR(64),
    profile_name                    VARCHAR(255),
    user_role_id                    VARCHAR(64),
    user_role_name                  VARCHAR(255),
    user_license_key                VARCHAR(255),
    locale                          VARCHAR(32),
    timezone_id                     VARCHAR(64),
    organization_id                 VARCHAR(64),
    organization_name               VARCHAR(255),
    organization_environment_type   VARCHAR(32),
    organization_instance_name      VARCHAR(64),
    organization_namespace_prefix   VARCHAR(64),
    api_version                     VARCHAR(16),
    session_id                      VARCHAR(255),
    session_type                    VARCHAR(64),
    session_security_level          VARCHAR(64),
    login_type                      VARCHAR(64),
    login_history_id                VARCHAR(64),
    login_application               VARCHAR(255),
    login_platform                  VARCHAR(255),
    login_browser                   VARCHAR(255),
    login_domain                    VARCHAR(255),
    source_ip                       VARCHAR(64),
    network_id                      VARCHAR(64),
    system_mode                     VARCHAR(32),
    user_logging_level              VARCHAR(16),
    release_number                  VARCHAR(32),
    release_version                 VARCHAR(64),
    create_date                     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    write_date                      TIMESTAMPTZ DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_log_runs_created ON log_runs (create_date DESC);
CREATE INDEX IF NOT EXISTS idx_log_runs_unenriched ON log_runs (create_date)
    WHERE release_number IS NULL;
CREATE INDEX IF NOT EXISTS idx_log_runs_parent ON log_runs (parent_transaction_id);

-- ================================================================
-- Log entries (one per event)
-- ================================================================

CREATE TABLE IF NOT EXISTS log_entries (
    id                          BIGSERIAL PRIMARY KEY,
    run_id                      BIGINT NOT NULL REFERENCES log_runs(id) ON DELETE CASCADE,
    transaction_entry_number    INTEGER,
    logging_level               VARCHAR(16) NOT NULL,
    logging_level_ordinal       INTEGER,
    message                     TEXT,
    message_truncated           BOOLEAN NOT NULL DEFAULT FALSE,
    exception_type              VARCHAR(255),
    exception_message           TEXT,
    exception_stack_trace       TEXT,
    stack_trace                 TEXT,
    origin_type                 VARCHAR(32),
    origin_location             VARCHAR(255),
    record_id                   VARCHAR(64),
    record_type                 VARCHAR(255),
    record_json                 TEXT,
    event_timestamp             TIMESTAMPTZ NOT NULL,
    cpu_time_max                BIGINT,
    cpu_time_used               BIGINT,
    heap_size_max               BIGINT,
    heap_size_used              BIGINT,
    queries_max                 BIGINT,
    queries_used                BIGINT,
    query_rows_max              BIGINT,
    query_rows_used             BIGINT,
    dml_statements_max          BIGINT,
    dml_statements_used         BIGINT,
    dml_rows_max                BIGINT,
    dml_rows_used               BIGINT,
    callouts_max                BIGINT,
    callouts_used               BIGINT,
    future_calls_max            BIGINT,
    future_calls_used           BIGINT,
    queueable_jobs_max          BIGINT,
    queueable_jobs_used         BIGINT,
    email_invocations_max       BIGINT,
    email_invocations_used      BIGINT,
    aggregate_queries_max       BIGINT,
    aggregate_queries_used      BIGINT,
    search_queries_max          BIGINT,
    search_queries_used         BIGINT,
    push_notifications_max      BIGINT,
    push_notifications_used     BIGINT,
    create_date                 TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_log_entries_run ON log_entries (run_id);

-- ================================================================
-- Tags and links
-- ================================================================

CREATE TABLE IF NOT EXISTS log_tags (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL UNIQUE,
    create_date     TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS log_tag_links (
    id              BIGSERIAL PRIMARY KEY,
    target_kind     VARCHAR(16) NOT NULL,
    target_id       BIGINT NOT NULL,
    tag_id          BIGINT NOT NULL REFERENCES log_tags(id) ON DELETE CASCADE,
    create_date     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (target_kind, target_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_log_tag_links_tag ON log_tag_links (tag_id);

-- ================================================================
-- Enrichment lease (single in-flight enrichment job)
-- ================================================================

CREATE TABLE IF NOT EXISTS log_enrichment_leases (
    name            VARCHAR(64) PRIMARY KEY,
    holder          VARCHAR(64) NOT NULL,
    acquired_at     TIMESTAMPTZ NOT NULL,
    expires_at      TIMESTAMPTZ NOT NULL
);
"#;

/// Run the log ingestion migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("log migration failed: {e}"))?;
    Ok(())
}
