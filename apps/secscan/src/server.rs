//! HTTP service
//!
//! `GET /status` describes the live database, `POST /check` answers a
//! `composer.lock` body against it and `POST /reflect` echoes the request.
//! Until the first database is published `/check` answers 503 rather than
//! reporting every lock file as clean.
//! Handlers only read through the query engine, so a refresh running in the
//! background never blocks or tears a response.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use secscan_events::{CheckEvent, EventEmitter, EventSender};
use secscan_types::ComposerLock;
use secscan_vulndb::QueryEngine;
use serde::Serialize;
use std::future::Future;
use tokio::net::TcpListener;

/// Build date stamped in by the release pipeline
pub const BUILD_DATE: &str = match option_env!("SECSCAN_BUILD_DATE") {
    Some(date) => date,
    None => "unknown",
};

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    engine: QueryEngine,
    event_sender: Option<EventSender>,
}

impl AppState {
    pub fn new(engine: QueryEngine) -> Self {
        Self {
            engine,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }
}

impl EventEmitter for AppState {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Body of `GET /status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub dbsha1: Option<String>,
    pub version: &'static str,
    pub build_date: &'static str,
    pub advisories: usize,
    pub packages: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
}

/// Routes of the service
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/check", post(check))
        .route("/reflect", post(reflect))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.engine.handle().current();
    Json(StatusResponse {
        dbsha1: snapshot.fingerprint().map(ToString::to_string),
        version: env!("CARGO_PKG_VERSION"),
        build_date: BUILD_DATE,
        advisories: snapshot.database().len(),
        packages: snapshot.database().package_count(),
        refreshed_at: snapshot.refreshed_at(),
    })
}

async fn check(State(state): State<AppState>, body: Bytes) -> Response {
    // Only the empty startup snapshot lacks a fingerprint, and a handle never
    // goes back to it once a database is published.
    if state.engine.handle().fingerprint().is_none() {
        tracing::debug!("check refused, no vulnerability database published yet");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "vulnerability database not loaded",
            }),
        )
            .into_response();
    }

    let lock = match ComposerLock::from_slice(&body) {
        Ok(lock) => lock,
        Err(e) => {
            state.emit_check(CheckEvent::DecodeFailed {
                reason: e.to_string(),
            });
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "malformed request",
                }),
            )
                .into_response();
        }
    };

    Json(state.engine.check(lock.items())).into_response()
}

async fn reflect(body: Bytes) -> Bytes {
    body
}
