//! Retry with exponential backoff for donor page fetches.
//!
//! Transient conditions (429 responses, network-level failures) are retried
//! after a delay. Everything else — 404s, selector mismatches, option
//! extraction failures — is propagated immediately since retrying cannot
//! change the outcome.

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

/// Returns `true` if `err` represents a transient condition worth retrying
/// after a backoff delay.
fn is_retriable(err: &ScrapeError) -> bool {
    matches!(
        err,
        ScrapeError::RateLimited { .. } | ScrapeError::Http(_)
    )
}

/// Executes `operation` with exponential backoff retries on transient
/// errors.
///
/// On a retriable error the function sleeps `backoff_base_secs * 2^attempt`
/// seconds and tries again, up to `max_retries` additional attempts after
/// the first try. Non-retriable errors return immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                err
            }
        };

        // Cap the shift to avoid overflow on extreme configs.
        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A donor host that answers 429 to the first `throttled` fetches before
    /// serving the page.
    struct FlakyDonor {
        attempts: AtomicU32,
        throttled: u32,
    }

    impl FlakyDonor {
        fn new(throttled: u32) -> Self {
            Self {
                attempts: AtomicU32::new(0),
                throttled,
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }

        async fn fetch_page(&self) -> Result<String, ScrapeError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.throttled {
                return Err(ScrapeError::RateLimited {
                    domain: "donor.example".to_owned(),
                    retry_after_secs: 0,
                });
            }
            Ok("<html><h1>Parfum Lux</h1></html>".to_owned())
        }
    }

    #[tokio::test]
    async fn healthy_page_needs_a_single_fetch() {
        let donor = FlakyDonor::new(0);
        let body = retry_with_backoff(3, 0, || donor.fetch_page())
            .await
            .unwrap();
        assert!(body.contains("Parfum Lux"));
        assert_eq!(donor.attempts(), 1);
    }

    #[tokio::test]
    async fn throttled_page_is_refetched_until_served() {
        let donor = FlakyDonor::new(2);
        let body = retry_with_backoff(3, 0, || donor.fetch_page())
            .await
            .unwrap();
        assert!(body.contains("Parfum Lux"));
        assert_eq!(donor.attempts(), 3);
    }

    #[tokio::test]
    async fn persistent_throttling_exhausts_the_retry_budget() {
        let donor = FlakyDonor::new(u32::MAX);
        let result = retry_with_backoff(2, 0, || donor.fetch_page()).await;
        assert!(matches!(result, Err(ScrapeError::RateLimited { .. })));
        // max_retries=2 allows three attempts in total.
        assert_eq!(donor.attempts(), 3);
    }

    #[tokio::test]
    async fn removed_product_page_is_not_refetched() {
        let attempts = AtomicU32::new(0);
        let result = retry_with_backoff::<String, _, _>(3, 0, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ScrapeError::NotFound {
                    url: "https://donor.example/p/znyato-z-prodazhu/".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(ScrapeError::NotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
