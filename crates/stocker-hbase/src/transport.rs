//! Short-lived HTTP transports.
//!
//! Every gateway call builds its own `reqwest::Client` and drops it afterwards.

use std::time::Duration;

use stocker_core::error::{Result, StockerError};

pub(crate) const JSON: &str = "application/json";

/// Build a fresh transport for one call.
pub(crate) fn build(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StockerError::Transport(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn send_error(context: &str, e: reqwest::Error) -> StockerError {
    StockerError::Transport(format!("{context}: {e}"))
}

/// Read the full response body, failing on non-success statuses.
pub(crate) async fn success_body(resp: reqwest::Response, context: &str) -> Result<Vec<u8>> {
    let status = resp.status();
    if !status.is_success() {
        return Err(StockerError::protocol(status.as_u16(), context));
    }
    let bytes = resp.bytes().await.map_err(|e| send_error(context, e))?;
    Ok(bytes.to_vec())
}
