//! Remote catalog entities and write payloads.
//!
//! Read types carry `#[serde(default)]` on everything optional so partial
//! responses from older remote versions still decode. Write payloads skip
//! unset fields entirely, which is what makes variant updates minimal
//! diffs rather than full rewrites.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAttribute {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteTerm {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCategory {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteBrand {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteImage {
    #[serde(default)]
    pub src: String,
}

/// One `name=option` pair on a remote variant. `name` is the attribute
/// slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantAttribute {
    pub name: String,
    pub option: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariant {
    pub id: i64,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    #[serde(default)]
    pub image: Option<RemoteImage>,
    #[serde(default)]
    pub attributes: Vec<VariantAttribute>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImagePayload {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRef {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrandRef {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributePayload {
    pub id: i64,
    pub options: Vec<String>,
    pub variation: bool,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaData {
    pub key: String,
    pub value: String,
}

/// Full product write payload; used for both create and update.
#[derive(Debug, Clone, Serialize)]
pub struct ProductPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImagePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub brands: Vec<BrandRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_attributes: Vec<VariantAttribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub meta_data: Vec<MetaData>,
}

/// Variant write payload. Every field optional: a create sets all known
/// fields, an update sets only the fields that differ from the remote.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariantPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<VariantAttribute>,
}

impl VariantPayload {
    /// True when the payload carries no field worth sending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regular_price.is_none()
            && self.sale_price.is_none()
            && self.sku.is_none()
            && self.image.is_none()
            && self.attributes.is_empty()
    }
}
