//! Reconciliation of scraped products against the remote catalog.
//!
//! The reconciler is idempotent by construction. The ledger decides
//! whether a product is new or already synced; every remote write is
//! confirmed before the ledger learns about it; and a remote product that
//! vanished since the last run is recreated rather than failed. Nothing is
//! ever deleted remotely.
//!
//! Writes are ordered so that every reference exists before it is used:
//! attributes and their terms first, then the category path (level by
//! level, each looked up by slug under its parent), then the brand term,
//! then the product, then its variants.

use donorsync_core::category::slugify;
use donorsync_core::ledger::Ledger;
use donorsync_core::product::{OptionKey, Product, Variant};

use crate::api::CatalogApi;
use crate::error::CatalogError;
use crate::payload::{
    product_payload, variant_create_payload, variant_update_payload, ResolvedRefs,
};
use crate::types::RemoteVariant;

/// What happened to one product during a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No ledger entry and no adoptable remote product existed.
    Created,
    /// The ledger pointed at a live remote product.
    Updated,
    /// The ledger pointed at a remote product that no longer exists.
    Recreated,
    /// The product synced but one or more variants failed.
    Partial,
}

/// Per-product result of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub external_id: String,
    pub remote_product_id: i64,
    pub outcome: SyncOutcome,
    pub variants_created: usize,
    pub variants_updated: usize,
    pub variants_unchanged: usize,
    /// One entry per variant that failed; the rest of the product is
    /// unaffected.
    pub variant_failures: Vec<String>,
    pub warnings: Vec<String>,
}

pub struct Reconciler<'a> {
    api: &'a dyn CatalogApi,
    ledger: &'a dyn Ledger,
    status: String,
}

impl<'a> Reconciler<'a> {
    #[must_use]
    pub fn new(api: &'a dyn CatalogApi, ledger: &'a dyn Ledger, status: &str) -> Self {
        Self {
            api,
            ledger,
            status: status.to_owned(),
        }
    }

    /// Reconciles one product against the remote catalog.
    ///
    /// # Errors
    ///
    /// Fails on remote errors during reference resolution or the product
    /// write itself, and on ledger storage errors. Individual variant
    /// failures do NOT fail the product; they are collected in the report.
    pub async fn sync_product(&self, product: &Product) -> Result<SyncReport, CatalogError> {
        let mut warnings = Vec::new();
        let refs = self.resolve_refs(product).await?;
        let payload = product_payload(product, &self.status, &refs);

        let (remote_id, outcome, freshly_created) =
            match self.ledger.get_product(&product.external_id).await? {
                Some(known_id) => match self.api.update_product(known_id, &payload).await {
                    Ok(updated) => (updated.id, SyncOutcome::Updated, false),
                    Err(CatalogError::NotFound { .. }) => {
                        tracing::warn!(
                            external_id = %product.external_id,
                            stale_remote_id = known_id,
                            "remote product vanished, recreating"
                        );
                        let created = self.api.create_product(&payload).await?;
                        self.ledger
                            .put_product(&product.external_id, created.id)
                            .await?;
                        (created.id, SyncOutcome::Recreated, true)
                    }
                    Err(err) => return Err(err),
                },
                None => {
                    if let Some(adopted) = self.adopt_by_sku(product).await? {
                        warnings.push(format!(
                            "adopted existing remote product {adopted} by SKU match"
                        ));
                        // The ledger learns about the adoption only once the
                        // remote write has confirmed the product is ours.
                        let updated = self.api.update_product(adopted, &payload).await?;
                        self.ledger
                            .put_product(&product.external_id, updated.id)
                            .await?;
                        (updated.id, SyncOutcome::Updated, false)
                    } else {
                        let created = self.api.create_product(&payload).await?;
                        self.ledger
                            .put_product(&product.external_id, created.id)
                            .await?;
                        (created.id, SyncOutcome::Created, true)
                    }
                }
            };

        let mut report = SyncReport {
            external_id: product.external_id.clone(),
            remote_product_id: remote_id,
            outcome,
            variants_created: 0,
            variants_updated: 0,
            variants_unchanged: 0,
            variant_failures: Vec::new(),
            warnings,
        };

        if product.is_variable() {
            self.sync_variants(product, remote_id, freshly_created, &mut report)
                .await?;
            if !report.variant_failures.is_empty() {
                report.outcome = SyncOutcome::Partial;
            }
        }

        tracing::info!(
            external_id = %product.external_id,
            remote_product_id = remote_id,
            outcome = ?report.outcome,
            variants_created = report.variants_created,
            variants_updated = report.variants_updated,
            "product reconciled"
        );
        Ok(report)
    }

    /// Resolves every remote reference the product payload needs, creating
    /// missing ones.
    async fn resolve_refs(&self, product: &Product) -> Result<ResolvedRefs, CatalogError> {
        let mut refs = ResolvedRefs::default();

        for (slug, values) in &product.attributes {
            let attribute = match self.api.find_attribute(slug).await? {
                Some(existing) => existing,
                None => {
                    let name = attribute_display_name(slug);
                    tracing::debug!(slug, "creating remote attribute");
                    self.api.create_attribute(&name, slug).await?
                }
            };
            refs.attribute_ids.insert(slug.clone(), attribute.id);

            let existing_terms = self.api.list_terms(attribute.id).await?;
            for value in &values.values {
                let known = existing_terms
                    .iter()
                    .any(|t| t.name.eq_ignore_ascii_case(value));
                if !known {
                    tracing::debug!(slug, value, "creating remote attribute term");
                    self.api.create_term(attribute.id, value).await?;
                }
            }
        }

        let mut parent = 0i64;
        for node in &product.categories {
            let category = match self.api.find_category(&node.slug, parent).await? {
                Some(existing) => existing,
                None => {
                    tracing::debug!(slug = %node.slug, parent, "creating remote category");
                    self.api
                        .create_category(&node.display_name, &node.slug, parent)
                        .await?
                }
            };
            refs.category_ids.push(category.id);
            parent = category.id;
        }

        if let Some(brand) = &product.brand {
            let slug = slugify(brand);
            let remote = match self.api.find_brand(&slug).await? {
                Some(existing) => existing,
                None => {
                    tracing::debug!(brand, "creating remote brand");
                    self.api.create_brand(brand, &slug).await?
                }
            };
            refs.brand_id = Some(remote.id);
        }

        Ok(refs)
    }

    /// Looks for an adoptable remote product by SKU when the ledger has no
    /// entry. Returns the remote id to back-fill, if any.
    async fn adopt_by_sku(&self, product: &Product) -> Result<Option<i64>, CatalogError> {
        let Some(sku) = product.sku.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .api
            .find_product_by_sku(sku)
            .await?
            .map(|remote| remote.id))
    }

    async fn sync_variants(
        &self,
        product: &Product,
        remote_product_id: i64,
        freshly_created: bool,
        report: &mut SyncReport,
    ) -> Result<(), CatalogError> {
        // A product created this run has no variants to list.
        let remote_variants = if freshly_created {
            Vec::new()
        } else {
            self.api.list_variants(remote_product_id).await?
        };

        for variant in &product.variants {
            match self
                .sync_one_variant(remote_product_id, variant, &remote_variants)
                .await
            {
                Ok(VariantAction::Created) => report.variants_created += 1,
                Ok(VariantAction::Updated) => report.variants_updated += 1,
                Ok(VariantAction::Unchanged) => report.variants_unchanged += 1,
                Err(CatalogError::Ledger(err)) => return Err(CatalogError::Ledger(err)),
                Err(err) => {
                    tracing::warn!(
                        external_id = %product.external_id,
                        option_key = %variant.option_key,
                        error = %err,
                        "variant sync failed, continuing with remaining variants"
                    );
                    report
                        .variant_failures
                        .push(format!("{}: {err}", variant.option_key));
                }
            }
        }

        let local_keys: Vec<String> = product
            .variants
            .iter()
            .map(|v| v.option_key.canonical())
            .collect();
        for remote in &remote_variants {
            let known_locally = product
                .variants
                .iter()
                .any(|v| matches_option_key(remote, &v.option_key));
            if !known_locally {
                tracing::debug!(
                    remote_variant_id = remote.id,
                    local_keys = ?local_keys,
                    "remote variant has no local counterpart; leaving it in place"
                );
            }
        }

        Ok(())
    }

    async fn sync_one_variant(
        &self,
        remote_product_id: i64,
        variant: &Variant,
        remote_variants: &[RemoteVariant],
    ) -> Result<VariantAction, CatalogError> {
        let key = variant.option_key.canonical();

        let known_id = match self.ledger.get_variant(remote_product_id, &key).await? {
            Some(id) => Some(id),
            None => {
                // Cold ledger: match by attribute combination and back-fill.
                let matched = remote_variants
                    .iter()
                    .find(|r| matches_option_key(r, &variant.option_key))
                    .map(|r| r.id);
                if let Some(id) = matched {
                    self.ledger.put_variant(remote_product_id, &key, id).await?;
                }
                matched
            }
        };

        match known_id {
            Some(variant_id) => {
                let Some(remote) = remote_variants.iter().find(|r| r.id == variant_id) else {
                    // Ledger points at a variant deleted remotely.
                    return self.create_variant(remote_product_id, variant, &key).await;
                };
                let payload = variant_update_payload(variant, remote);
                if payload.is_empty() {
                    return Ok(VariantAction::Unchanged);
                }
                match self
                    .api
                    .update_variant(remote_product_id, variant_id, &payload)
                    .await
                {
                    Ok(_) => Ok(VariantAction::Updated),
                    Err(CatalogError::NotFound { .. }) => {
                        self.create_variant(remote_product_id, variant, &key).await
                    }
                    Err(err) => Err(err),
                }
            }
            None => self.create_variant(remote_product_id, variant, &key).await,
        }
    }

    async fn create_variant(
        &self,
        remote_product_id: i64,
        variant: &Variant,
        key: &str,
    ) -> Result<VariantAction, CatalogError> {
        let payload = variant_create_payload(variant);
        let created = self.api.create_variant(remote_product_id, &payload).await?;
        self.ledger
            .put_variant(remote_product_id, key, created.id)
            .await?;
        Ok(VariantAction::Created)
    }
}

enum VariantAction {
    Created,
    Updated,
    Unchanged,
}

/// True when the remote variant's attribute pairs equal the local option
/// key exactly.
fn matches_option_key(remote: &RemoteVariant, key: &OptionKey) -> bool {
    if remote.attributes.len() != key.0.len() {
        return false;
    }
    remote.attributes.iter().all(|attr| {
        key.0
            .get(&attr.name)
            .is_some_and(|option| option == &attr.option)
    })
}

/// Human-readable attribute name derived from a canonical slug, used only
/// when the remote attribute has to be created.
fn attribute_display_name(slug: &str) -> String {
    let base = slug.strip_prefix("pa_").unwrap_or(slug);
    let mut name = base.replace(['-', '_'], " ");
    if let Some(first) = name.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    name
}
