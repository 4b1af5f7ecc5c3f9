//! Shared retry utilities for platform operations.
//!
//! Retries are off unless `max_retries` is raised; when enabled only
//! rate-limit errors are retried.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::progress::{MirrorProgress, ProgressCallback};

/// Initial backoff before the first retry.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;

/// Upper bound on a single backoff.
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Minimum delay between retries.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts. Zero disables retrying.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_delay: Duration::from_millis(MAX_BACKOFF_MS),
            max_retries: 0,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
            with_jitter: true,
        }
    }

    /// Default delays with `max_retries` attempts.
    #[must_use]
    pub fn with_max_retries(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }
}

/// Execute an operation, retrying rate-limit errors per `config`.
///
/// # Arguments
///
/// * `operation` - The async operation to retry. Must be a closure that returns a `Future`.
/// * `config` - Backoff settings; `max_retries == 0` runs the operation once.
/// * `is_rate_limit` - Decides whether an error is worth retrying.
/// * `short_message` - A function that extracts a short error message for logging.
/// * `label` - What is being attempted, for progress reporting.
/// * `on_progress` - Optional callback for reporting retry progress.
///
/// # Example
///
/// ```ignore
/// use repomirror::retry::{RetryConfig, with_retry};
/// use repomirror::platform::{PlatformError, short_error_message};
///
/// let page = with_retry(
///     || client.list_repositories_page(3),
///     &RetryConfig::with_max_retries(3),
///     PlatformError::is_rate_limited,
///     short_error_message,
///     "page 3",
///     None,
/// ).await?;
/// ```
pub async fn with_retry<T, E, F, Fut, IsRateLimit, ShortMsg>(
    mut operation: F,
    config: &RetryConfig,
    is_rate_limit: IsRateLimit,
    short_message: ShortMsg,
    label: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
    IsRateLimit: Fn(&E) -> bool + Send + Sync + 'static,
    ShortMsg: Fn(&E) -> String + Send + Sync + 'static,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(config.clone().into_backoff())
        .notify(|err, dur| {
            let current_attempt = attempt.load(Ordering::SeqCst);
            if let Some(cb) = on_progress {
                cb(MirrorProgress::RateLimitBackoff {
                    operation: label.to_string(),
                    retry_after_ms: dur.as_millis() as u64,
                    attempt: current_attempt,
                });
            }
            tracing::debug!(
                operation = label,
                attempt = current_attempt,
                delay_ms = dur.as_millis() as u64,
                error = %short_message(err),
                "Rate limited, retrying"
            );
        })
        .when(is_rate_limit)
        .await
}
