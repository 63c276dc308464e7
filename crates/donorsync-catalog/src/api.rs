//! The remote catalog surface the reconciler depends on.
//!
//! Narrow by construction: each method is one remote operation, and the
//! trait is the seam for both the REST client and the in-memory fake the
//! reconciliation tests run against.

use async_trait::async_trait;

use crate::error::CatalogError;
use crate::types::{
    ProductPayload, RemoteAttribute, RemoteBrand, RemoteCategory, RemoteProduct, RemoteTerm,
    RemoteVariant, VariantPayload,
};

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn find_attribute(&self, slug: &str) -> Result<Option<RemoteAttribute>, CatalogError>;

    async fn create_attribute(
        &self,
        name: &str,
        slug: &str,
    ) -> Result<RemoteAttribute, CatalogError>;

    async fn list_terms(&self, attribute_id: i64) -> Result<Vec<RemoteTerm>, CatalogError>;

    async fn create_term(&self, attribute_id: i64, name: &str)
        -> Result<RemoteTerm, CatalogError>;

    /// Category lookup is by `(slug, parent)` — the same slug may exist
    /// under different parents.
    async fn find_category(
        &self,
        slug: &str,
        parent: i64,
    ) -> Result<Option<RemoteCategory>, CatalogError>;

    async fn create_category(
        &self,
        name: &str,
        slug: &str,
        parent: i64,
    ) -> Result<RemoteCategory, CatalogError>;

    async fn find_brand(&self, slug: &str) -> Result<Option<RemoteBrand>, CatalogError>;

    async fn create_brand(&self, name: &str, slug: &str) -> Result<RemoteBrand, CatalogError>;

    /// SKU lookup used to adopt pre-existing remote products when the
    /// ledger has no entry yet.
    async fn find_product_by_sku(&self, sku: &str)
        -> Result<Option<RemoteProduct>, CatalogError>;

    async fn create_product(&self, payload: &ProductPayload)
        -> Result<RemoteProduct, CatalogError>;

    /// # Errors
    ///
    /// [`CatalogError::NotFound`] when `product_id` no longer exists
    /// remotely; the reconciler recreates the product in that case.
    async fn update_product(
        &self,
        product_id: i64,
        payload: &ProductPayload,
    ) -> Result<RemoteProduct, CatalogError>;

    async fn list_variants(&self, product_id: i64) -> Result<Vec<RemoteVariant>, CatalogError>;

    async fn create_variant(
        &self,
        product_id: i64,
        payload: &VariantPayload,
    ) -> Result<RemoteVariant, CatalogError>;

    async fn update_variant(
        &self,
        product_id: i64,
        variant_id: i64,
        payload: &VariantPayload,
    ) -> Result<RemoteVariant, CatalogError>;
}
