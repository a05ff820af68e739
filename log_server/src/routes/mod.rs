//! Log intake HTTP routes.

pub mod api;
pub mod intake;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::services::ingest_service::Ingestor;

/// Shared state for log route handlers.
#[derive(Clone)]
pub struct LogRouterState {
    pub ingestor: Ingestor,
}

/// Build the log intake router (nested at `/logs`).
pub fn log_router(state: LogRouterState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Intake
        .route("/api/batches", post(intake_handler))
        // Read API
        .route("/api/runs/{transaction_id}", get(get_run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn intake_handler(
    State(state): State<LogRouterState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<intake::BatchResponse>), StatusCode> {
    intake::handle_batch(&state.ingestor, &headers, body)
        .await
        .map(|r| (StatusCode::CREATED, Json(r)))
}

async fn get_run(
    State(state): State<LogRouterState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<api::RunJson>, StatusCode> {
    match api::get_run(state.ingestor.store().as_ref(), &transaction_id).await {
        Ok(Some(run)) => Ok(Json(run)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Run lookup error: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
