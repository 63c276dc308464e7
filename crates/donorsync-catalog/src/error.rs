use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote entity not found: {entity} {reference}")]
    NotFound { entity: String, reference: String },

    #[error("remote rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("rate limited by the remote catalog (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("failed to decode remote response from {url}: {message}")]
    Deserialize { url: String, message: String },

    #[error("ledger error: {0}")]
    Ledger(#[from] donorsync_core::ledger::LedgerError),
}

impl CatalogError {
    /// True for errors that a later retry of the whole product may clear.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::RateLimited { .. } | Self::UnexpectedStatus { status: 500..=599, .. }
        )
    }
}
