//! Bounded, fixed-delay retry for the news feed.
//!
//! Policy: attempt the fetch; on a transient failure (HTTP status or network)
//! wait a fixed delay and try again, up to `max_attempts` attempts. When
//! attempts run out, or the feed answers with a body it cannot parse, the date
//! degrades to an empty artifact instead of an error. The attempt counter lives on the stack
//! of each `fetch` call, so every date starts with a full budget.

use super::provider::{DataError, FeedSource, NewsOrigin};
use crate::domain::{format_key, DateKey, NewsArtifact};
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed-delay retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    /// Five attempts, five seconds apart.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

/// A [`NewsOrigin`] built from a single-shot [`FeedSource`] plus a retry policy.
pub struct RetryingNewsOrigin<S> {
    source: S,
    policy: RetryPolicy,
}

impl<S: FeedSource> RetryingNewsOrigin<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: FeedSource> NewsOrigin for RetryingNewsOrigin<S> {
    fn name(&self) -> &str {
        self.source.name()
    }

    fn fetch(&self, date: DateKey) -> NewsArtifact {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            match self.source.fetch_once(date) {
                Ok(artifact) => {
                    debug!(
                        origin = self.source.name(),
                        date = %format_key(date),
                        attempt,
                        items = artifact.len(),
                        "news feed fetched"
                    );
                    return artifact;
                }
                Err(e) if !is_transient(&e) => {
                    warn!(
                        origin = self.source.name(),
                        date = %format_key(date),
                        attempt,
                        error = %e,
                        "news feed answered with an unusable response; continuing with an empty artifact"
                    );
                    return NewsArtifact::new();
                }
                Err(e) => {
                    warn!(
                        origin = self.source.name(),
                        date = %format_key(date),
                        attempt,
                        max_attempts,
                        error = %e,
                        "news feed fetch failed"
                    );
                    if attempt < max_attempts {
                        std::thread::sleep(self.policy.delay);
                    }
                }
            }
        }

        warn!(
            origin = self.source.name(),
            date = %format_key(date),
            "news feed retries exhausted; continuing with an empty artifact"
        );
        NewsArtifact::new()
    }
}

/// Failures worth another attempt after the delay.
fn is_transient(err: &DataError) -> bool {
    matches!(
        err,
        DataError::HttpStatus { .. } | DataError::NetworkUnreachable(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    /// Fails the first `failures` calls, then succeeds with one headline.
    struct FlakySource {
        failures: u32,
        error: fn() -> DataError,
        calls: AtomicU32,
    }

    impl FlakySource {
        fn new(failures: u32) -> Self {
            Self::failing_with(failures, || DataError::HttpStatus {
                origin: "flaky".into(),
                status: 503,
            })
        }

        fn failing_with(failures: u32, error: fn() -> DataError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FeedSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch_once(&self, date: DateKey) -> Result<NewsArtifact, DataError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err((self.error)());
            }
            let mut a = NewsArtifact::new();
            a.push(format!("{date} 10:00"), "ok");
            Ok(a)
        }
    }

    fn date() -> DateKey {
        NaiveDate::from_ymd_opt(2022, 3, 7).unwrap()
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let origin = RetryingNewsOrigin::new(FlakySource::new(2), RetryPolicy::new(5, Duration::ZERO));
        let artifact = origin.fetch(date());
        assert_eq!(artifact.len(), 1);
        assert_eq!(origin.source().calls(), 3);
    }

    #[test]
    fn exhausted_retries_degrade_to_empty() {
        let origin =
            RetryingNewsOrigin::new(FlakySource::new(u32::MAX), RetryPolicy::new(4, Duration::ZERO));
        let artifact = origin.fetch(date());
        assert!(artifact.is_empty());
        assert!(artifact.validate().is_ok());
        assert_eq!(origin.source().calls(), 4);
    }

    #[test]
    fn network_errors_are_retried() {
        let source = FlakySource::failing_with(1, || {
            DataError::NetworkUnreachable("connection reset".into())
        });
        let origin = RetryingNewsOrigin::new(source, RetryPolicy::new(5, Duration::ZERO));
        assert_eq!(origin.fetch(date()).len(), 1);
        assert_eq!(origin.source().calls(), 2);
    }

    #[test]
    fn unparseable_body_degrades_without_retry() {
        let source = FlakySource::failing_with(u32::MAX, || {
            DataError::ResponseFormatChanged("<html>captcha</html>".into())
        });
        let delay = Duration::from_secs(60);
        let origin = RetryingNewsOrigin::new(source, RetryPolicy::new(5, delay));

        let started = Instant::now();
        let artifact = origin.fetch(date());
        assert!(artifact.is_empty());
        assert_eq!(origin.source().calls(), 1);
        assert!(started.elapsed() < delay);
    }

    #[test]
    fn attempt_budget_resets_per_date() {
        let origin =
            RetryingNewsOrigin::new(FlakySource::new(u32::MAX), RetryPolicy::new(3, Duration::ZERO));
        origin.fetch(date());
        origin.fetch(date().succ_opt().unwrap());
        assert_eq!(origin.source().calls(), 6);
    }

    #[test]
    fn waits_between_attempts() {
        let delay = Duration::from_millis(20);
        let origin = RetryingNewsOrigin::new(FlakySource::new(u32::MAX), RetryPolicy::new(3, delay));

        let started = Instant::now();
        origin.fetch(date());
        let elapsed = started.elapsed();

        // Two waits between three attempts.
        assert!(elapsed >= delay * 2, "elapsed {elapsed:?}");
    }

    #[test]
    fn zero_attempts_clamps_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn default_policy_matches_feed_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_secs(5));
    }
}
