//! Batch intake handler — validates and ingests one delivered batch.

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use serde::Serialize;

use crate::models::event::RawEvent;
use crate::models::run::EnrichmentState;
use crate::services::ingest_service::Ingestor;
use crate::services::intake_service;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub run_id: i64,
    pub transaction_id: String,
    pub entry_count: usize,
    pub tag_count: usize,
    pub tag_link_count: usize,
    pub enrichment: &'static str,
    pub enrichment_state: EnrichmentState,
}

/// Handle an incoming batch payload.
pub async fn handle_batch(
    ingestor: &Ingestor,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<BatchResponse, StatusCode> {
    let signature = headers
        .get("x-log-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !intake_service::validate_signature(&ingestor.config().intake_secret, &body, signature) {
        tracing::warn!("Intake signature validation failed");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let events: Vec<RawEvent> = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Rejecting malformed batch: {e}");
        StatusCode::BAD_REQUEST
    })?;

    if let Err(reason) = intake_service::check_batch(&events) {
        tracing::debug!("Rejecting batch: {reason}");
        return Err(StatusCode::BAD_REQUEST);
    }

    match ingestor.process_batch(&events).await {
        Ok(outcome) => Ok(BatchResponse {
            run_id: outcome.run.id,
            transaction_id: outcome.run.transaction_id.clone(),
            entry_count: outcome.entries.len(),
            tag_count: outcome.tags.tag_count,
            tag_link_count: outcome.tags.link_count,
            enrichment: outcome.enrichment.label(),
            enrichment_state: outcome.enrichment.state(),
        }),
        Err(e) => {
            tracing::error!("Failed to ingest batch: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
