//! Webhook handler for push events

use axum::{
    body::Bytes,
    extract::State as AxumState,
    extract::rejection::BytesRejection,
    http::{HeaderMap, StatusCode},
};
use tracing::{debug, error, info, warn};

use crate::SharedState;
use crate::error::WebhookError;
use crate::run::{Run, RunStatus};
use crate::signature::{SHA1_SIGNATURE_HEADER, SHA256_SIGNATURE_HEADER, verify};
use crate::webhook::{Commit, PushEvent};

const EVENT_HEADER: &str = "X-GitHub-Event";

/// Handles the webhook POST request.
///
/// Answers as soon as the delivery is authenticated and decoded; trigger
/// evaluation and the task run happen afterwards on a background task.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, WebhookError> {
    let body = body.map_err(|e| {
        error!("Failed to read request body: {}", e);
        WebhookError::BodyRead(e.to_string())
    })?;

    // Prefer the SHA-256 signature; a bad one is never rescued by SHA-1
    let signature = headers
        .get(SHA256_SIGNATURE_HEADER)
        .or_else(|| headers.get(SHA1_SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify(&state.config.webhook_secret, &body, signature) {
        warn!("Invalid Webhook");
        return Err(WebhookError::Authentication);
    }

    match headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok()) {
        Some("push") | None => {}
        Some(event) => {
            info!("Not push event; Received {:?} event", event);
            return Ok(StatusCode::NO_CONTENT);
        }
    }

    let payload = PushEvent::from_slice(&body).map_err(|e| {
        error!("Failed to parse JSON payload: {}", e);
        WebhookError::PayloadDecode(e)
    })?;

    let shared_state = state.clone();
    tokio::spawn(async move {
        process_push(shared_state, payload.head_commit).await;
    });

    // Return immediately so the sender never waits on the tasks
    Ok(StatusCode::OK)
}

/// Evaluates the trigger paths for `commit` and runs the tasks if any of
/// them changed. The finished run is published on `run_events`.
pub async fn process_push(state: SharedState, commit: Commit) -> Run {
    let mut run = Run::from_commit(&commit);
    info!(
        "Received webhook for commit: {} \"{}\" at {}",
        commit.id,
        commit.summary(),
        run.received_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    debug!(
        "Commit by {} <{}> at {}",
        commit.author.name, commit.author.email, commit.timestamp
    );

    run.matched_paths = state.matcher.matching_paths(&commit);

    if run.matched_paths.is_empty() {
        info!("No changes in trigger paths");
        run.mark_skipped();
    } else {
        info!(
            "One or more changes in trigger paths ({}), running tasks...",
            run.matched_paths.join(", ")
        );

        // Only one run at a time unless overlap was explicitly allowed
        let _guard = if state.config.serialize_runs {
            Some(state.run_execution_lock.lock().await)
        } else {
            None
        };

        info!("Run {} started", run.id);
        let results = state.runner.run().await;
        run.mark_finished(results);

        match run.status {
            RunStatus::Success => info!("Run {} completed successfully.", run.id),
            _ => error!(
                "Run {} finished with {} failed task(s) out of {}",
                run.id,
                run.failed_tasks(),
                run.results.len()
            ),
        }
    }

    info!("Still listening...");
    let _ = state.run_events.send(run.clone());
    run
}
