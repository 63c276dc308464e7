//! Mapping from the canonical product model to remote write payloads.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use donorsync_core::product::{Product, ProductKind, Variant};

use crate::types::{
    AttributePayload, BrandRef, CategoryRef, ImagePayload, MetaData, ProductPayload,
    RemoteVariant, VariantAttribute, VariantPayload,
};

/// Meta key carrying the donor external id on remote products.
pub const EXTERNAL_ID_META_KEY: &str = "donor_external_id";

/// Remote identifiers resolved by the sub-protocols that run before the
/// product write: category path, brand term, attribute definitions.
#[derive(Debug, Clone, Default)]
pub struct ResolvedRefs {
    /// Ids along the category path, root first. The product references all
    /// of them; the remote renders the hierarchy.
    pub category_ids: Vec<i64>,
    pub brand_id: Option<i64>,
    /// Attribute slug → remote attribute id.
    pub attribute_ids: BTreeMap<String, i64>,
}

/// Formats a price the way the remote expects it: plain decimal string,
/// at most two fraction digits, no trailing zeros beyond the cents.
#[must_use]
pub fn format_price(price: Decimal) -> String {
    price.round_dp(2).normalize().to_string()
}

fn prices_equal(local: Decimal, remote: &str) -> bool {
    remote
        .trim()
        .parse::<Decimal>()
        .is_ok_and(|r| r == local)
}

/// Builds the full product payload for a create or a product-level update.
#[must_use]
pub fn product_payload(product: &Product, status: &str, refs: &ResolvedRefs) -> ProductPayload {
    let kind = match product.kind {
        ProductKind::Simple => "simple",
        ProductKind::Variable => "variable",
    };

    let attributes = product
        .attributes
        .iter()
        .filter_map(|(slug, values)| {
            refs.attribute_ids.get(slug).map(|id| AttributePayload {
                id: *id,
                options: values.values.clone(),
                variation: values.is_variation,
                visible: true,
            })
        })
        .collect();

    let default_attributes = product
        .default_options
        .iter()
        .map(|(slug, option)| VariantAttribute {
            name: slug.clone(),
            option: option.clone(),
        })
        .collect();

    ProductPayload {
        name: product.title.clone(),
        kind: kind.to_owned(),
        status: status.to_owned(),
        sku: product.sku.clone(),
        // A variable product's price lives on its variants.
        regular_price: (product.kind == ProductKind::Simple)
            .then(|| product.base_price.map(format_price))
            .flatten(),
        sale_price: (product.kind == ProductKind::Simple)
            .then(|| product.sale_price.map(format_price))
            .flatten(),
        description: product.description_html.clone(),
        images: product
            .images
            .iter()
            .map(|image| ImagePayload {
                src: image.url.clone(),
                alt: image.alt.clone(),
            })
            .collect(),
        categories: refs
            .category_ids
            .iter()
            .map(|id| CategoryRef { id: *id })
            .collect(),
        brands: refs.brand_id.map(|id| BrandRef { id }).into_iter().collect(),
        attributes,
        default_attributes,
        meta_data: vec![MetaData {
            key: EXTERNAL_ID_META_KEY.to_owned(),
            value: product.external_id.clone(),
        }],
    }
}

/// Builds the payload that creates a variant: every known field plus the
/// identifying attribute options.
#[must_use]
pub fn variant_create_payload(variant: &Variant) -> VariantPayload {
    VariantPayload {
        regular_price: variant.price.map(format_price),
        sale_price: variant.sale_price.map(format_price),
        sku: variant.sku.clone(),
        image: variant.image.clone().map(|src| ImagePayload { src, alt: None }),
        attributes: option_key_attributes(variant),
    }
}

/// Builds the minimal update payload for an existing remote variant: only
/// the fields whose local value differs from the remote one. An empty
/// payload means the variant is already in sync and no request is needed.
#[must_use]
pub fn variant_update_payload(variant: &Variant, remote: &RemoteVariant) -> VariantPayload {
    let mut payload = VariantPayload::default();

    if let Some(price) = variant.price {
        if !prices_equal(price, &remote.regular_price) {
            payload.regular_price = Some(format_price(price));
        }
    }

    match variant.sale_price {
        Some(sale) => {
            if !prices_equal(sale, &remote.sale_price) {
                payload.sale_price = Some(format_price(sale));
            }
        }
        // No local discount: clear a stale remote one.
        None => {
            if !remote.sale_price.trim().is_empty() {
                payload.sale_price = Some(String::new());
            }
        }
    }

    if let Some(sku) = &variant.sku {
        if *sku != remote.sku {
            payload.sku = Some(sku.clone());
        }
    }

    if let Some(image) = &variant.image {
        let remote_src = remote.image.as_ref().map_or("", |i| i.src.as_str());
        if image != remote_src {
            payload.image = Some(ImagePayload {
                src: image.clone(),
                alt: None,
            });
        }
    }

    payload
}

/// The `name=option` pairs identifying a variant remotely, from its option
/// key.
#[must_use]
pub fn option_key_attributes(variant: &Variant) -> Vec<VariantAttribute> {
    variant
        .option_key
        .0
        .iter()
        .map(|(name, option)| VariantAttribute {
            name: name.clone(),
            option: option.clone(),
        })
        .collect()
}
