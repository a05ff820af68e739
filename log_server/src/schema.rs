//! Diesel table definitions for log run ingestion.
//!
//! Tables: log_runs, log_entries, log_tags, log_tag_links,
//! log_enrichment_leases.

diesel::table! {
    log_runs (id) {
        id -> Int8,
        transaction_id -> Varchar,
        parent_transaction_id -> Nullable<Varchar>,
        logged_by_id -> Nullable<Varchar>,
        logged_by_username -> Nullable<Varchar>,
        user_type -> Nullable<Varchar>,
        profile_id -> Nullable<Varchar>,
        profile_name -> Nullable<Varchar>,
        user_role_id -> Nullable<Varchar>,
        user_role_name -> Nullable<Varchar>,
        user_license_key -> Nullable<Varchar>,
        locale -> Nullable<Varchar>,
        timezone_id -> Nullable<Varchar>,
        organization_id -> Nullable<Varchar>,
        organization_name -> Nullable<Varchar>,
        organization_environment_type -> Nullable<Varchar>,
        organization_instance_name -> Nullable<Varchar>,
        organization_namespace_prefix -> Nullable<Varchar>,
        api_version -> Nullable<Varchar>,
        session_id -> Nullable<Varchar>,
        session_type -> Nullable<Varchar>,
        session_security_level -> Nullable<Varchar>,
        login_type -> Nullable<Varchar>,
        login_history_id -> Nullable<Varchar>,
        login_application -> Nullable<Varchar>,
        login_platform -> Nullable<Varchar>,
        login_browser -> Nullable<Varchar>,
        login_domain -> Nullable<Varchar>,
        source_ip -> Nullable<Varchar>,
        network_id -> Nullable<Varchar>,
        system_mode -> Nullable<Varchar>,
        user_logging_level -> Nullable<Varchar>,
        release_number -> Nullable<Varchar>,
        release_version -> Nullable<Varchar>,
        create_date -> Timestamptz,
        write_date -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    log_entries (id) {
        id -> Int8,
        run_id -> Int8,
        transaction_entry_number -> Nullable<Int4>,
        logging_level -> Varchar,
        logging_level_ordinal -> Nullable<Int4>,
        message -> Nullable<Text>,
        message_truncated -> Bool,
        exception_type -> Nullable<Varchar>,
        exception_message -> Nullable<Text>,
        exception_stack_trace -> Nullable<Text>,
        stack_trace -> Nullable<Text>,
        origin_type -> Nullable<Varchar>,
        origin_location -> Nullable<Varchar>,
        record_id -> Nullable<Varchar>,
        record_type -> Nullable<Varchar>,
        record_json -> Nullable<Text>,
        event_timestamp -> Timestamptz,
        cpu_time_max -> Nullable<Int8>,
        cpu_time_used -> Nullable<Int8>,
        heap_size_max -> Nullable<Int8>,
        heap_size_used -> Nullable<Int8>,
        queries_max -> Nullable<Int8>,
        queries_used -> Nullable<Int8>,
        query_rows_max -> Nullable<Int8>,
        query_rows_used -> Nullable<Int8>,
        dml_statements_max -> Nullable<Int8>,
        dml_statements_used -> Nullable<Int8>,
        dml_rows_max -> Nullable<Int8>,
        dml_rows_used -> Nullable<Int8>,
        callouts_max -> Nullable<Int8>,
        callouts_used -> Nullable<Int8>,
        future_calls_max -> Nullable<Int8>,
        future_calls_used -> Nullable<Int8>,
        queueable_jobs_max -> Nullable<Int8>,
        queueable_jobs_used -> Nullable<Int8>,
        email_invocations_max -> Nullable<Int8>,
        email_invocations_used -> Nullable<Int8>,
        aggregate_queries_max -> Nullable<Int8>,
        aggregate_queries_used -> Nullable<Int8>,
        search_queries_max -> Nullable<Int8>,
        search_queries_used -> Nullable<Int8>,
        push_notifications_max -> Nullable<Int8>,
        push_notifications_used -> Nullable<Int8>,
        create_date -> Timestamptz,
    }
}

diesel::table! {
    log_tags (id) {
        id -> Int8,
        name -> Varchar,
        create_date -> Timestamptz,
    }
}

diesel::table! {
    log_tag_links (id) {
        id -> Int8,
        target_kind -> Varchar,
        target_id -> Int8,
        tag_id -> Int8,
        create_date -> Timestamptz,
    }
}

diesel::table! {
    log_enrichment_leases (name) {
        name -> Varchar,
        holder -> Varchar,
        acquired_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

// Foreign key relationships
diesel::joinable!(log_entries -> log_runs (run_id));
diesel::joinable!(log_tag_links -> log_tags (tag_id));

diesel::allow_tables_to_appear_in_same_query!(
    log_runs,
    log_entries,
    log_tags,
    log_tag_links,
    log_enrichment_leases,
);
