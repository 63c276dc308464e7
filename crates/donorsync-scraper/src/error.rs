use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid CSS selector \"{selector}\"")]
    InvalidSelector { selector: String },

    #[error("selector \"{selector}\" matched nothing for {context}")]
    SelectorMismatch { selector: String, context: String },

    #[error("no variation options found on {url} (profile declares the donor variable-capable)")]
    NoOptionsFound { url: String },

    #[error("rendered interaction is not supported by this page source")]
    RenderUnsupported,

    #[error("timed out waiting for a state change after selecting an option on {url}")]
    RenderTimeout { url: String },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
