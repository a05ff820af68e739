//! Shared fixtures for log_server integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use logbatch_server::models::event::RawEvent;
use logbatch_server::LogConfig;

/// A stand-in release status endpoint. Counts every request it serves.
pub struct StatusStub {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl StatusStub {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/v1/instances/{instance}/status",
            get(move |Path(_instance): Path<String>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (status, body)
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> LogConfig {
        LogConfig {
            status_base_url: self.base_url.clone(),
            instance_name: "NA42".to_string(),
            ..LogConfig::default()
        }
    }
}

pub const RELEASE_BODY: &str = r#"{"releaseNumber":"58","releaseVersion":"Spring"}"#;

pub fn event(transaction_id: &str, tags: Option<&str>) -> RawEvent {
    RawEvent {
        transaction_id: transaction_id.to_string(),
        logging_level: "INFO".to_string(),
        message: Some(format!("hello from {transaction_id}")),
        logged_by_username: Some("ops@example.com".to_string()),
        organization_instance_name: Some("NA42".to_string()),
        tags: tags.map(str::to_string),
        timestamp: Some(chrono::Utc::now()),
        ..RawEvent::default()
    }
}
