use tokio::net::TcpListener;
use tracing::warn;

use crate::error::{LitePipeError, Result};

/// Ports tried, starting with the configured one, before giving up.
pub const MAX_PORT_ATTEMPTS: u16 = 100;

/// Binds `address:port`, moving on to the next port while the current one
/// is unavailable. Returns the listener and the port it ended up on.
pub async fn bind_with_retry(address: &str, port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for candidate in (port..=u16::MAX).take(MAX_PORT_ATTEMPTS as usize) {
        match TcpListener::bind((address, candidate)).await {
            Ok(listener) => return Ok((listener, candidate)),
            Err(e) => {
                warn!("Port {} is not available ({}), trying the next one...", candidate, e);
                last_error = Some(e);
            }
        }
    }

    Err(LitePipeError::ConfigError(format!(
        "No available port on {} starting from {}: {}",
        address,
        port,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
