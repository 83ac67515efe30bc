//! Fixed back-off retry for lookup requests.
//!
//! [`retry_with_backoff`] retries transient failures (network errors, HTTP
//! 429, 5xx) after a constant pause. Anything else is returned immediately so
//! the caller can skip the term.

use std::future::Future;
use std::time::Duration;

use crate::error::LookupError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** network-level failures, [`LookupError::RateLimited`], and
/// [`LookupError::UnexpectedStatus`] with a 5xx code.
///
/// **Not retriable:** other statuses (404, 403, ...), undecodable bodies and
/// an invalid base URL.
pub(crate) fn is_retriable(err: &LookupError) -> bool {
    match err {
        LookupError::Http(_) | LookupError::RateLimited { .. } => true,
        LookupError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        LookupError::Deserialize { .. } | LookupError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient
/// errors, sleeping `backoff` before each retry.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff: Duration,
    mut operation: F,
) -> Result<T, LookupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LookupError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient lookup error, retrying after back-off"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
