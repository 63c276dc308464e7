//! Remote catalog integration: REST client, payload mapping, and the
//! ledger-driven reconciler that pushes scraped products upstream.

pub mod api;
pub mod client;
pub mod error;
pub mod payload;
pub mod reconcile;
pub mod types;

pub use api::CatalogApi;
pub use client::RestCatalogClient;
pub use error::CatalogError;
pub use payload::{format_price, product_payload, ResolvedRefs, EXTERNAL_ID_META_KEY};
pub use reconcile::{Reconciler, SyncOutcome, SyncReport};
