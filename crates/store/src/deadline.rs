//! Per-operation deadline for network-backed stores.

use std::future::IntoFuture;
use std::time::Duration;

use famledger_core::StoreError;

/// Upper bound for a single store round-trip.
pub const OP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timed out after {}s", OP_TIMEOUT.as_secs())
    }
}

impl std::error::Error for TimedOut {}

impl From<TimedOut> for StoreError {
    fn from(e: TimedOut) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Await `fut`, giving up after [`OP_TIMEOUT`].
pub async fn within<F: IntoFuture>(fut: F) -> Result<F::Output, TimedOut> {
    within_for(OP_TIMEOUT, fut).await
}

pub(crate) async fn within_for<F: IntoFuture>(
    limit: Duration,
    fut: F,
) -> Result<F::Output, TimedOut> {
    tokio::time::timeout(limit, fut.into_future())
        .await
        .map_err(|_| TimedOut)
}
