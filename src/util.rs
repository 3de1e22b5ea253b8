//! Shared helpers used across pipeline components.

use std::future::Future;
use std::time::Duration;

/// Run `fut` with a deadline; return `fallback` if it does not complete
/// in time.
///
/// Every external call the pipeline makes (semantic analyzer, subscriber
/// dispatch, DOM extraction) goes through this wrapper so a slow or
/// hanging collaborator degrades the pipeline's information rather than
/// stalling it. Callers are expected to record a `LOW_VISIBILITY_ZONE`
/// event when the fallback path is taken.
pub async fn with_timeout<T, F>(fut: F, deadline: Duration, fallback: T) -> (T, bool)
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(value) => (value, false),
        Err(_) => (fallback, true),
    }
}
