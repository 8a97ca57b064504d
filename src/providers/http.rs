//! Shared HTTP plumbing for the provider clients

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Client;
use std::time::Duration;

/// Number of characters of an error body kept in error messages
const ERROR_BODY_CHARS: usize = 200;

/// Builds the HTTP client every provider shares
///
/// The client-level timeout bounds each request end to end; callers add a
/// `tokio::time::timeout` on top so a stalled body read cannot outlive it.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reads a `Retry-After` header given in seconds
///
/// HTTP-date values, non-positive numbers and values too large for a
/// `Duration` are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    let seconds = value.parse::<f64>().ok()?;
    if !(seconds.is_finite() && seconds > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(seconds).ok()
}

/// Shortens an error body for inclusion in an error message
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_CHARS).collect()
}
