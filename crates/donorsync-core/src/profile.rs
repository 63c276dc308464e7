use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Immutable description of one donor site: DOM selectors, pagination
/// rules, variation strategy hints, and attribute/category mappings.
///
/// Loaded from a single YAML document and validated before any scraping
/// begins. Components receive a `&Profile` explicitly — there is no ambient
/// "active profile" state, so concurrent multi-profile runs are safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub site: SiteSection,
    pub selectors: SelectorSection,
    #[serde(default)]
    pub listing: ListingSection,
    #[serde(default)]
    pub variations: VariationSection,
    #[serde(default)]
    pub attributes: AttributeSection,
    #[serde(default)]
    pub categories: CategorySection,
    /// Fixed brand term applied to every product from this donor.
    #[serde(default)]
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSection {
    /// Base URL used to resolve relative links and image sources.
    pub base_url: String,
}

/// CSS selectors for the product page fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSection {
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price_regular: Option<String>,
    #[serde(default)]
    pub price_sale: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gallery_images: Option<String>,
    #[serde(default)]
    pub breadcrumbs: Option<String>,
    /// Optional selector applied within each breadcrumb element to find the
    /// display name; defaults to the crumb's own text.
    #[serde(default)]
    pub breadcrumb_name: Option<String>,
    /// Literal prefix stripped from the extracted SKU text (e.g. a donor
    /// label like "Артикул:").
    #[serde(default)]
    pub sku_strip_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingSection {
    /// Selector for product links on a category listing page.
    #[serde(default)]
    pub product_link: Option<String>,
    /// Selector for the next-page link; pagination stops when absent.
    #[serde(default)]
    pub next_page: Option<String>,
}

/// Hints for the variant-resolution engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariationSection {
    /// Selector for the option elements (buttons/links) of the variation
    /// widget. Absent means the donor has no variations.
    #[serde(default)]
    pub options: Option<String>,
    /// Selector for the currently active option (drives default_options).
    #[serde(default)]
    pub active: Option<String>,
    /// Donor-side display name of the variation attribute (mapped through
    /// `attributes.map` to a canonical slug).
    #[serde(default)]
    pub attribute: Option<String>,
    /// Declares that products on this donor are expected to be variable;
    /// an empty option set then becomes an extraction error instead of a
    /// silent Simple classification.
    #[serde(default)]
    pub variable_capable: bool,
    /// Option labels treated as placeholders ("any", "будь-який") and
    /// filtered out before counting options.
    #[serde(default)]
    pub placeholder_labels: Vec<String>,
    /// Selector for the AJAX form powering the partial-fetch strategy.
    #[serde(default)]
    pub partial_form: Option<String>,
    /// Fallback form parameter name when the form exposes no hidden input.
    #[serde(default)]
    pub partial_param: Option<String>,
    /// Regex with one capture group matching the variant-number portion of
    /// the product URL (e.g. `-(\d+)-ml/?$`); powers the direct-URL
    /// strategy via digit substitution.
    #[serde(default)]
    pub url_pattern: Option<String>,
    /// Selector to click per option under the rendered-interaction
    /// strategy.
    #[serde(default)]
    pub render_option: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeSection {
    /// Donor attribute display name → canonical attribute slug.
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    /// Per-attribute option-value normalization: slug → (donor value →
    /// normalized value).
    #[serde(default)]
    pub values: BTreeMap<String, BTreeMap<String, String>>,
}

impl AttributeSection {
    /// Canonical slug for a donor attribute name; generated from the name
    /// when no explicit mapping exists.
    #[must_use]
    pub fn slug_for(&self, donor_name: &str) -> String {
        self.map.get(donor_name).cloned().unwrap_or_else(|| {
            let generated = crate::category::slugify(donor_name);
            format!("pa_{generated}")
        })
    }

    /// Normalized option value for an attribute; falls back to the donor
    /// value when no mapping exists.
    #[must_use]
    pub fn normalize_value(&self, attribute_slug: &str, donor_value: &str) -> String {
        self.values
            .get(attribute_slug)
            .and_then(|m| m.get(donor_value))
            .cloned()
            .unwrap_or_else(|| donor_value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySection {
    /// Breadcrumb display name → explicit category slug.
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    /// Breadcrumb display names dropped entirely (storefront root labels).
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Drop the trailing crumb (the product title itself). Donors that end
    /// the trail on the leaf category set this to false.
    #[serde(default = "default_true")]
    pub drop_last: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CategorySection {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
            exclude: Vec::new(),
            drop_last: true,
        }
    }
}

/// Load and validate a donor profile from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation. Validation failures surface before any scraping begins.
pub fn load_profile(path: &Path) -> Result<Profile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfileFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let profile: Profile = serde_yaml::from_str(&content)?;
    validate_profile(&profile)?;
    Ok(profile)
}

fn validate_profile(profile: &Profile) -> Result<(), ConfigError> {
    if profile.site.base_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site.base_url must be non-empty".to_string(),
        ));
    }
    if !profile.site.base_url.starts_with("http") {
        return Err(ConfigError::Validation(format!(
            "site.base_url must be absolute, got '{}'",
            profile.site.base_url
        )));
    }
    if profile.selectors.title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "selectors.title must be non-empty".to_string(),
        ));
    }
    if profile.variations.variable_capable && profile.variations.options.is_none() {
        return Err(ConfigError::Validation(
            "variations.variable_capable requires variations.options".to_string(),
        ));
    }
    for (donor, slug) in &profile.attributes.map {
        if slug.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "attribute mapping for '{donor}' has an empty slug"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
site:
  base_url: "https://donor.example"
selectors:
  title: "h1.product__title"
"#;

    fn parse(yaml: &str) -> Result<Profile, ConfigError> {
        let profile: Profile = serde_yaml::from_str(yaml)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    #[test]
    fn minimal_profile_parses() {
        let profile = parse(MINIMAL).expect("minimal profile should validate");
        assert_eq!(profile.site.base_url, "https://donor.example");
        assert!(profile.variations.options.is_none());
        assert!(profile.categories.drop_last, "drop_last defaults to true");
    }

    #[test]
    fn rejects_relative_base_url() {
        let yaml = r#"
site:
  base_url: "donor.example"
selectors:
  title: "h1"
"#;
        let err = parse(yaml).expect_err("relative base_url must fail");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_variable_capable_without_options_selector() {
        let yaml = r#"
site:
  base_url: "https://donor.example"
selectors:
  title: "h1"
variations:
  variable_capable: true
"#;
        let err = parse(yaml).expect_err("variable_capable without options must fail");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn attribute_slug_falls_back_to_generated() {
        let section = AttributeSection::default();
        assert_eq!(section.slug_for("Обʼєм"), "pa_obyem");
    }

    #[test]
    fn attribute_slug_prefers_explicit_mapping() {
        let yaml = r#"
site:
  base_url: "https://donor.example"
selectors:
  title: "h1"
attributes:
  map:
    "Обʼєм": "pa_volume"
  values:
    pa_volume:
      "30мл": "30 ml"
"#;
        let profile = parse(yaml).expect("profile should validate");
        assert_eq!(profile.attributes.slug_for("Обʼєм"), "pa_volume");
        assert_eq!(
            profile.attributes.normalize_value("pa_volume", "30мл"),
            "30 ml"
        );
        assert_eq!(
            profile.attributes.normalize_value("pa_volume", "50мл"),
            "50мл",
            "unmapped values pass through"
        );
    }
}
