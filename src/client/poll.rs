//! Long-poll loop shared by every job-backed operation.
//!
//! Terminal rules, applied in order on each check:
//! 1. `status == "complete"` returns the payload.
//! 2. An explicit failure (`status == "failed"`, or `success == false` with
//!    any status other than `"processing"`) fails immediately with the
//!    service-provided error. No retry.
//! 3. After `max_polls` checks with no terminal status, the job times out.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{DatalabError, Result};
use crate::settings::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL_SECS};

/// Poll budget for one job: at most `max_polls` checks, `poll_interval` apart.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub max_polls: usize,
    pub poll_interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_polls: DEFAULT_MAX_POLLS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl PollConfig {
    /// Total time budget (`max_polls` × `poll_interval`).
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_polls as u32
    }
}

/// Status-check seam. The HTTP client implements this against the check URL
/// returned at submit time; tests script it with canned sequences.
#[async_trait]
pub trait CheckStatus {
    async fn check(&self, check_url: &str) -> Result<Value>;
}

/// Poll a check URL until the job reaches a terminal state.
///
/// Makes exactly one status request per iteration and suspends between
/// checks without blocking sibling pollers.
pub async fn poll_until_complete<C>(checker: &C, check_url: &str, config: PollConfig) -> Result<Value>
where
    C: CheckStatus + ?Sized + Sync,
{
    for attempt in 1..=config.max_polls {
        let data = checker.check(check_url).await?;

        let status = data.get("status").and_then(Value::as_str);
        if status == Some("complete") {
            debug!("job complete after {} checks", attempt);
            return Ok(data);
        }

        let success = data.get("success").and_then(Value::as_bool).unwrap_or(true);
        if status == Some("failed") || (!success && status != Some("processing")) {
            let message = data
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(DatalabError::api(format!("Processing failed: {}", message)));
        }

        if attempt < config.max_polls {
            tokio::time::sleep(config.poll_interval).await;
        }
    }

    Err(DatalabError::Timeout {
        attempts: config.max_polls,
        budget: config.budget(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted checker: returns each response in turn, repeating the last.
    struct Script {
        responses: Vec<Value>,
        calls: AtomicUsize,
    }

    impl Script {
        fn new(responses: Vec<Value>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CheckStatus for Script {
        async fn check(&self, _check_url: &str) -> Result<Value> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.responses[n.min(self.responses.len() - 1)].clone())
        }
    }

    fn fast(max_polls: usize) -> PollConfig {
        PollConfig {
            max_polls,
            poll_interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_completes_after_exact_checks() {
        let script = Script::new(vec![
            json!({"status": "processing", "success": true}),
            json!({"status": "processing", "success": true}),
            json!({"status": "complete", "success": true, "markdown": "# ok"}),
        ]);

        let data = poll_until_complete(&script, "check-url", fast(10))
            .await
            .unwrap();
        assert_eq!(script.calls(), 3);
        assert_eq!(data["markdown"], "# ok");
    }

    #[tokio::test]
    async fn test_timeout_after_budget() {
        let script = Script::new(vec![json!({"status": "processing", "success": true})]);

        let err = poll_until_complete(&script, "check-url", fast(5))
            .await
            .unwrap_err();
        assert_eq!(script.calls(), 5);
        assert!(matches!(err, DatalabError::Timeout { attempts: 5, .. }));
    }

    #[tokio::test]
    async fn test_explicit_failure_stops_immediately() {
        let script = Script::new(vec![
            json!({"status": "failed", "success": false, "error": "boom"}),
        ]);

        let err = poll_until_complete(&script, "check-url", fast(10))
            .await
            .unwrap_err();
        assert_eq!(script.calls(), 1);
        assert!(err.to_string().contains("boom"));
        assert!(matches!(err, DatalabError::Api { .. }));
    }

    #[tokio::test]
    async fn test_unsuccessful_processing_keeps_polling() {
        // success=false while still processing is not terminal.
        let script = Script::new(vec![
            json!({"status": "processing", "success": false}),
            json!({"status": "complete", "success": true}),
        ]);

        let data = poll_until_complete(&script, "check-url", fast(10))
            .await
            .unwrap();
        assert_eq!(script.calls(), 2);
        assert_eq!(data["status"], "complete");
    }

    #[tokio::test]
    async fn test_unsuccessful_unknown_status_fails() {
        let script = Script::new(vec![json!({"status": "errored", "success": false})]);

        let err = poll_until_complete(&script, "check-url", fast(10))
            .await
            .unwrap_err();
        assert_eq!(script.calls(), 1);
        assert!(err.to_string().contains("Unknown error"));
    }
}
