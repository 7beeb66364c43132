//! Router and request handlers.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use pipeline::{DeliveryId, DeliveryLog, TraceStore, WorkspaceId};
use runner::CiEngine;
use tracing::{debug, error, info, warn};

use crate::{MISSING_DELIVERY_HEADER, MISSING_EVENT_HEADER};

/// Body for a trace id that no run registered.
pub const NO_TRACE: &str = "no trace available";

/// Body for a known run whose hook wrote no `trace.txt`.
pub const NO_TRACE_FILE: &str = "no trace for this CI job";

const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Turns deliveries into queued hook runs.
    pub engine: CiEngine,
    /// Workspaces of past runs, looked up by `/traces/:trace_id`.
    pub traces: TraceStore,
    /// Per-event-type delivery counts served by `/deliveries`.
    pub deliveries: DeliveryLog,
}

impl AppState {
    /// Bundles the handler state.
    pub fn new(engine: CiEngine, traces: TraceStore, deliveries: DeliveryLog) -> Self {
        Self {
            engine,
            traces,
            deliveries,
        }
    }
}

/// Builds the listener's router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(receive_webhook))
        .route("/traces/:trace_id", get(trace))
        .route("/deliveries", get(deliveries))
        .with_state(state)
}

/// GET /
async fn index() -> &'static str {
    "hookci: POST GitHub webhook deliveries to this URL\n"
}

/// POST / - one webhook delivery
///
/// Acknowledges every delivery, including malformed ones: the host only
/// needs to know it arrived, and hook runs happen after the response.
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> &'static str {
    let event_type = header_or(&headers, "x-github-event", MISSING_EVENT_HEADER);
    let delivery = header_or(&headers, "x-github-delivery", MISSING_DELIVERY_HEADER);
    info!(event = %event_type, %delivery, bytes = body.len(), "webhook received");

    if let Some(id) = DeliveryId::new(delivery.clone()) {
        state.deliveries.record(&event_type, id);
    }

    // Payload storage and hook discovery touch the file system.
    let engine = state.engine.clone();
    let event = event_type.clone();
    let handled =
        tokio::task::spawn_blocking(move || engine.handle_delivery(&event, &body)).await;

    match handled {
        Ok(Ok(outcome)) if outcome.queued.is_empty() => {
            debug!(event = %event_type, %delivery, "no hooks queued");
        }
        Ok(Ok(outcome)) => {
            info!(event = %event_type, %delivery, queued = outcome.queued.len(), "hooks queued");
        }
        Ok(Err(e)) => warn!(event = %event_type, %delivery, error = %e, "delivery rejected"),
        Err(e) => error!(event = %event_type, %delivery, error = %e, "delivery handler panicked"),
    }

    "OK"
}

/// GET /traces/:trace_id
async fn trace(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
) -> impl IntoResponse {
    let body = match WorkspaceId::new(trace_id).and_then(|id| state.traces.trace_path(&id)) {
        None => NO_TRACE.to_string(),
        Some(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => NO_TRACE_FILE.to_string(),
        },
    };
    ([(header::CONTENT_TYPE, PLAIN_TEXT)], body)
}

/// GET /deliveries
async fn deliveries(State(state): State<AppState>) -> Json<BTreeMap<String, usize>> {
    Json(state.deliveries.snapshot())
}

fn header_or(headers: &HeaderMap, name: &str, default: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}
