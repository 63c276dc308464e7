pub mod collect;
pub mod preview;
pub mod sync;

use anyhow::Result;

use donorsync_core::AppConfig;
use donorsync_scraper::HttpPageSource;

/// Builds the HTTP page source all commands scrape through.
pub fn page_source(config: &AppConfig) -> Result<HttpPageSource> {
    Ok(HttpPageSource::new(
        config.request_timeout_secs,
        &config.user_agent,
        config.max_retries,
        config.retry_backoff_base_secs,
    )?)
}
