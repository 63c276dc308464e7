use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    /// Base URL of the remote catalog (e.g. `https://shop.example`).
    pub remote_base_url: String,
    /// REST API consumer key for the remote catalog.
    pub consumer_key: String,
    /// REST API consumer secret for the remote catalog.
    pub consumer_secret: String,
    /// Path of the SQLite reconciliation ledger.
    pub ledger_path: PathBuf,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// Upper bound on concurrently processed products in a batch run.
    pub max_concurrent_products: usize,
    /// Status assigned to newly created remote products ("draft"/"publish").
    pub default_status: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("remote_base_url", &self.remote_base_url)
            .field("consumer_key", &"[redacted]")
            .field("consumer_secret", &"[redacted]")
            .field("ledger_path", &self.ledger_path)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("max_concurrent_products", &self.max_concurrent_products)
            .field("default_status", &self.default_status)
            .finish()
    }
}
