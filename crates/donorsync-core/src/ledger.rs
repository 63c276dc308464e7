use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a [`Ledger`] implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0}")]
    Storage(String),
}

/// Durable mapping from local stable keys to remote entity identifiers.
///
/// This is the idempotency checkpoint of the reconciliation protocol:
/// `external_id → remote_product_id` and
/// `(remote_product_id, option_key) → remote_variant_id`. Entries are
/// written only after a confirmed remote write succeeds; a failed write
/// leaves no entry, so the next run retries cleanly from the same state.
///
/// Implementations must serialize access per key: different external ids
/// may proceed in parallel, but reads/writes of one entry are ordered.
/// The trait is deliberately narrow so the backing store (SQLite today)
/// can be swapped without touching the reconciler.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Remote product id previously recorded for this external id, if any.
    async fn get_product(&self, external_id: &str) -> Result<Option<i64>, LedgerError>;

    /// Records (or overwrites) the remote product id for an external id.
    async fn put_product(&self, external_id: &str, remote_product_id: i64)
        -> Result<(), LedgerError>;

    /// Remote variant id previously recorded for a product/option-key pair.
    /// `option_key` is the canonical string form of the variant's option
    /// combination.
    async fn get_variant(
        &self,
        remote_product_id: i64,
        option_key: &str,
    ) -> Result<Option<i64>, LedgerError>;

    /// Records (or overwrites) the remote variant id for a product/
    /// option-key pair.
    async fn put_variant(
        &self,
        remote_product_id: i64,
        option_key: &str,
        remote_variant_id: i64,
    ) -> Result<(), LedgerError>;
}
