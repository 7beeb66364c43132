//! hookci webhook receiver.
//!
//! An axum router that turns GitHub deliveries into [`runner::CiEngine`]
//! calls and serves the trace files hooks leave in their workspaces.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /` | Webhook delivery; always acknowledged with `200 OK` |
//! | `GET /` | Plain-text banner |
//! | `GET /traces/:trace_id` | `trace.txt` of one run |
//! | `GET /deliveries` | Delivery counts per event type (JSON) |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP parsing and response shapes live here. Hook runs
//! are queued by the engine, so no handler waits for a hook to finish.
//! Inbound deliveries are not authenticated.

pub mod routes;
pub mod server;

pub use routes::{router, AppState, NO_TRACE, NO_TRACE_FILE};
pub use server::serve;

/// Event type used when a delivery carries no `X-GitHub-Event` header.
pub const MISSING_EVENT_HEADER: &str = "no-header-X-GitHub-Event";

/// Delivery id used when a delivery carries no `X-GitHub-Delivery` header.
pub const MISSING_DELIVERY_HEADER: &str = "no-header-X-GitHub-Delivery";
