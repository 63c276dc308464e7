use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::category::CategoryNode;

/// Classification of an extracted product.
///
/// `Variable` iff the donor page exposes more than one purchasable option
/// combination. A page whose option probes all return identical data is
/// downgraded to `Simple` by the variant resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Simple,
    Variable,
}

/// A product image reference. The first image of a product's gallery is the
/// primary image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: Option<String>,
}

/// Values of one product attribute, plus whether the attribute participates
/// in variation (drives per-variant option combinations) or is merely
/// descriptive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub values: Vec<String>,
    pub is_variation: bool,
}

/// Ordered attribute-name → option-value mapping identifying one variant
/// within its parent product.
///
/// This is the stable diffing key across runs. It is NOT a remote
/// identifier — remote variant ids are looked up through the ledger or
/// matched by attribute combination. `BTreeMap` keeps the canonical form
/// independent of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct OptionKey(pub BTreeMap<String, String>);

impl OptionKey {
    /// Builds an option key from attribute/option pairs.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Canonical string form used as the ledger key, e.g.
    /// `"pa_obyem=30 ml"` or `"pa_color=red|pa_size=xl"`.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("|")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for OptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// One option combination of a [`ProductKind::Variable`] product.
///
/// Every field except `option_key` is independently optional; absence means
/// "inherit from parent / unset". The variant resolver fills in parent
/// values before the reconciler sees the product, so a `None` here survives
/// only when the parent has no value either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub option_key: OptionKey,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub sku: Option<String>,
    pub image: Option<String>,
}

/// Canonical record for one donor product page.
///
/// Created fresh per scrape, held in memory, and consumed immutably by the
/// reconciler — nothing mutates a `Product` after extraction completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Stable identifier derived from the donor URL; unique per donor and
    /// never changes across runs. This is the reconciliation key.
    pub external_id: String,
    pub title: String,
    pub sku: Option<String>,
    /// Sanitized description markup (scripts, styles, and inline style
    /// attributes removed at extraction time).
    pub description_html: Option<String>,
    pub kind: ProductKind,
    pub base_price: Option<Decimal>,
    /// Absent sale price means no discount.
    pub sale_price: Option<Decimal>,
    /// Ordered gallery, first is primary, deduplicated by URL.
    pub images: Vec<ImageRef>,
    pub attributes: BTreeMap<String, AttributeValues>,
    /// Default option per variation attribute, taken from the donor page's
    /// active selection when one exists.
    pub default_options: BTreeMap<String, String>,
    /// Category path, root → leaf.
    pub categories: Vec<CategoryNode>,
    pub brand: Option<String>,
    /// Present only when `kind == Variable`.
    pub variants: Vec<Variant>,
}

impl Product {
    #[must_use]
    pub fn is_variable(&self) -> bool {
        self.kind == ProductKind::Variable
    }

    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Returns the primary (first) gallery image, if any.
    #[must_use]
    pub fn primary_image(&self) -> Option<&ImageRef> {
        self.images.first()
    }

    /// Returns the attributes marked as variation-relevant.
    pub fn variation_attributes(&self) -> impl Iterator<Item = (&String, &AttributeValues)> {
        self.attributes.iter().filter(|(_, a)| a.is_variation)
    }
}

/// Derives the stable external id from a donor product URL: the last path
/// segment with any trailing slash, query string, or fragment stripped.
#[must_use]
pub fn external_id_from_url(url: &str) -> String {
    let no_meta = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = no_meta.trim_end_matches('/');
    trimmed
        .rsplit_once('/')
        .map_or(trimmed, |(_, last)| last)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_id_uses_last_path_segment() {
        assert_eq!(
            external_id_from_url("https://donor.example/catalog/parfum-lux-30-ml/"),
            "parfum-lux-30-ml"
        );
    }

    #[test]
    fn external_id_ignores_query_and_fragment() {
        assert_eq!(
            external_id_from_url("https://donor.example/p/abc-10?ref=promo#gallery"),
            "abc-10"
        );
    }

    #[test]
    fn external_id_is_stable_with_and_without_trailing_slash() {
        assert_eq!(
            external_id_from_url("https://donor.example/p/abc"),
            external_id_from_url("https://donor.example/p/abc/")
        );
    }

    #[test]
    fn option_key_canonical_is_order_independent() {
        let a = OptionKey::from_pairs([("pa_size", "xl"), ("pa_color", "red")]);
        let b = OptionKey::from_pairs([("pa_color", "red"), ("pa_size", "xl")]);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), "pa_color=red|pa_size=xl");
    }

    #[test]
    fn option_key_display_matches_canonical() {
        let key = OptionKey::from_pairs([("pa_obyem", "30 ml")]);
        assert_eq!(key.to_string(), "pa_obyem=30 ml");
    }

    #[test]
    fn variation_attributes_filters_descriptive_ones() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "pa_obyem".to_string(),
            AttributeValues {
                values: vec!["30 ml".to_string(), "50 ml".to_string()],
                is_variation: true,
            },
        );
        attributes.insert(
            "pa_brand".to_string(),
            AttributeValues {
                values: vec!["CROOZ".to_string()],
                is_variation: false,
            },
        );
        let product = Product {
            external_id: "p-1".to_string(),
            title: "Parfum".to_string(),
            sku: None,
            description_html: None,
            kind: ProductKind::Variable,
            base_price: None,
            sale_price: None,
            images: vec![],
            attributes,
            default_options: BTreeMap::new(),
            categories: vec![],
            brand: Some("CROOZ".to_string()),
            variants: vec![],
        };

        let variation: Vec<_> = product.variation_attributes().map(|(k, _)| k).collect();
        assert_eq!(variation, vec!["pa_obyem"]);
    }

    #[test]
    fn primary_image_is_first() {
        let product = Product {
            external_id: "p-1".to_string(),
            title: "Parfum".to_string(),
            sku: None,
            description_html: None,
            kind: ProductKind::Simple,
            base_price: None,
            sale_price: None,
            images: vec![
                ImageRef {
                    url: "https://cdn.example/a.jpg".to_string(),
                    alt: None,
                },
                ImageRef {
                    url: "https://cdn.example/b.jpg".to_string(),
                    alt: None,
                },
            ],
            attributes: BTreeMap::new(),
            default_options: BTreeMap::new(),
            categories: vec![],
            brand: None,
            variants: vec![],
        };
        assert_eq!(
            product.primary_image().map(|i| i.url.as_str()),
            Some("https://cdn.example/a.jpg")
        );
    }

    #[test]
    fn serde_roundtrip_product() {
        let product = Product {
            external_id: "abc-30-ml".to_string(),
            title: "Abc".to_string(),
            sku: Some("ABC-30".to_string()),
            description_html: Some("<p>ok</p>".to_string()),
            kind: ProductKind::Variable,
            base_price: Some(Decimal::new(1999, 2)),
            sale_price: None,
            images: vec![],
            attributes: BTreeMap::new(),
            default_options: BTreeMap::new(),
            categories: vec![],
            brand: Some("CROOZ".to_string()),
            variants: vec![Variant {
                option_key: OptionKey::from_pairs([("pa_obyem", "30 ml")]),
                price: Some(Decimal::new(1999, 2)),
                sale_price: None,
                sku: Some("ABC-30".to_string()),
                image: None,
            }],
        };
        let json = serde_json::to_string(&product).expect("serialization failed");
        let decoded: Product = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(decoded.external_id, product.external_id);
        assert_eq!(decoded.variants.len(), 1);
        assert_eq!(
            decoded.variants[0].option_key.canonical(),
            "pa_obyem=30 ml"
        );
    }
}
