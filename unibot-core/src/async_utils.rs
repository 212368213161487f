//! Async utilities and patterns
//!
//! Bounded waits for remote calls and panic containment for the pipeline entry point

use crate::error::{ErrorContext, UnibotError, UnibotResult};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::time::{timeout, Duration};
use tracing::warn;

/// Timeout wrapper for async operations.
///
/// The inner future is dropped on expiry, which cancels any in-flight request it owns.
pub async fn with_timeout<F, T>(future: F, timeout_ms: u64, operation_name: &str) -> UnibotResult<T>
where
    F: std::future::Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => {
            warn!(
                operation = operation_name,
                timeout_ms = timeout_ms,
                "Operation timed out"
            );
            Err(UnibotError::Timeout {
                operation: operation_name.to_string(),
                duration_ms: timeout_ms,
                context: ErrorContext::new("async_utils")
                    .with_operation("timeout")
                    .with_metadata("timeout_ms", &timeout_ms.to_string())
                    .with_suggestion("Increase timeout duration")
                    .with_suggestion("Check network connectivity")
                    .with_suggestion("Verify service availability"),
            })
        }
    }
}

/// Run a future to completion, turning a panic into its message.
pub async fn catch_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Unknown critical error occurred".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn timeout_reports_timeout_kind() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            "late"
        };

        let err = with_timeout(slow, 20, "slow_operation").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.message().contains("slow_operation"));
    }

    #[tokio::test]
    async fn catch_panic_returns_payload_text() {
        let result: Result<(), String> = catch_panic(async { panic!("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");

        let formatted: Result<(), String> =
            catch_panic(async { panic!("failed at {}", 3) }).await;
        assert_eq!(formatted.unwrap_err(), "failed at 3");

        assert_eq!(catch_panic(async { 7 }).await, Ok(7));
    }
}
