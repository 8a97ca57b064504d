//! Shared machinery around language model calls
//!
//! # Components
//!
//! - `RateLimiter`: process-wide FIFO spacing of model requests
//! - `RetryPolicy`: retry of rate-limited calls with hinted or exponential waits
//! - `parse_records`: tolerant parsing of model output into JSON records

mod limiter;
mod parser;
mod retry;

pub use limiter::RateLimiter;
pub use parser::{parse_records, ParseError};
pub use retry::{RetryPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY};

/// Truncates `text` to at most `max_chars` characters
///
/// Counting characters rather than bytes keeps the cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
