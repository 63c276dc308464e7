//! Page acquisition for donor sites.
//!
//! [`PageSource`] abstracts the three acquisition modes the variant
//! resolver escalates through: a plain fetch, an AJAX-style partial fetch
//! keyed by a variant token, and a rendered-page fetch that simulates
//! selecting an option and waits for an observable change.
//!
//! [`HttpPageSource`] implements the first two over plain HTTP. Rendered
//! interaction needs a browser; a browser-backed implementation is a
//! drop-in replacement for the trait, and this one reports the mode as
//! unsupported so the resolver can treat it as a failed strategy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::backoff::retry_with_backoff;
use crate::error::ScrapeError;

/// A variant token for partial-content requests: the form parameter name
/// and the option's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionToken {
    pub param: String,
    pub value: String,
}

/// Capability for acquiring donor page content.
///
/// Every method is a suspending operation; implementations own their
/// timeouts and the caller must not assume progress past a call without
/// the bounded timeout elapsing or the awaited condition firing.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page at `url` and returns its HTML.
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError>;

    /// Issues a partial-content request keyed by a variant token and
    /// returns the response body (JSON or an HTML fragment, donor
    /// dependent).
    async fn fetch_partial(&self, url: &str, token: &OptionToken)
        -> Result<String, ScrapeError>;

    /// Loads `url` in a rendered session, selects the option matched by
    /// `option_selector`, waits for an observable state change (URL change
    /// or DOM mutation) within a bounded timeout, and returns the
    /// now-current DOM as HTML.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::RenderTimeout`] when no change is observed in time;
    /// [`ScrapeError::RenderUnsupported`] when the implementation has no
    /// rendering capability.
    async fn render_and_select(
        &self,
        url: &str,
        option_selector: &str,
    ) -> Result<String, ScrapeError>;
}

/// HTTP-only [`PageSource`] over `reqwest`.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx
/// responses as typed errors; transient errors are retried with
/// exponential backoff up to `max_retries` additional attempts.
pub struct HttpPageSource {
    client: Client,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl HttpPageSource {
    /// Creates an `HttpPageSource` with configured timeout, `User-Agent`,
    /// and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    async fn check_and_read(response: reqwest::Response, url: &str) -> Result<String, ScrapeError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScrapeError::RateLimited {
                domain: extract_domain(url),
                retry_after_secs,
            });
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ScrapeError::NotFound {
                url: url.to_owned(),
            });
        }

        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.to_owned();
            async move {
                let response = self.client.get(&url).send().await?;
                Self::check_and_read(response, &url).await
            }
        })
        .await
    }

    async fn fetch_partial(
        &self,
        url: &str,
        token: &OptionToken,
    ) -> Result<String, ScrapeError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.to_owned();
            let form = [(token.param.clone(), token.value.clone())];
            async move {
                let response = self.client.post(&url).form(&form).send().await?;
                Self::check_and_read(response, &url).await
            }
        })
        .await
    }

    async fn render_and_select(
        &self,
        _url: &str,
        _option_selector: &str,
    ) -> Result<String, ScrapeError> {
        Err(ScrapeError::RenderUnsupported)
    }
}

fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
