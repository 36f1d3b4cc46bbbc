//! HTTP surface: a single `POST /` webhook endpoint

pub mod webhook;

use axum::{Router, extract::DefaultBodyLimit, routing};

pub use webhook::{handle_webhook, process_push};

use crate::SharedState;

/// Largest payload the provider will deliver
pub const MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::post(handle_webhook))
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .with_state(state)
}
