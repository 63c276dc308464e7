//! Variant resolution.
//!
//! A donor page that shows a variation widget rarely exposes per-variant
//! data in its initial HTML. The resolver walks an ordered list of
//! acquisition strategies, cheapest first, probing every option under each
//! strategy and accepting the first strategy whose probes are
//! distinguishable from one another. Identical probes across all options
//! mean the strategy only echoed parent-level data, so the resolver
//! escalates. When every strategy is exhausted the product is downgraded
//! to a simple product and the downgrade is reported as a warning instead
//! of an error.

use std::collections::BTreeMap;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::Html;

use donorsync_core::product::{OptionKey, ProductKind, Variant};
use donorsync_core::profile::Profile;

use crate::error::ScrapeError;
use crate::extract::{self, ExtractedOption, PartialFormInfo};
use crate::page_source::{OptionToken, PageSource};

/// The acquisition strategy that produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// AJAX partial-content request per option.
    PartialFetch,
    /// Full page fetch of a per-option URL.
    DirectUrl,
    /// Rendered session selecting each option in turn.
    RenderedInteraction,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PartialFetch => "partial-fetch",
            Self::DirectUrl => "direct-url",
            Self::RenderedInteraction => "rendered-interaction",
        };
        f.write_str(name)
    }
}

/// Variant-relevant fields observed for one option under one strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OptionProbe {
    price: Option<Decimal>,
    sale_price: Option<Decimal>,
    sku: Option<String>,
    image: Option<String>,
}

impl OptionProbe {
    fn is_empty(&self) -> bool {
        self.price.is_none() && self.sale_price.is_none() && self.sku.is_none() && self.image.is_none()
    }
}

/// Parent-level fields variants inherit when a probe leaves them unset.
#[derive(Debug, Clone, Default)]
pub struct ParentFields {
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub sku: Option<String>,
    pub image: Option<String>,
}

/// Outcome of variant resolution for one product page.
#[derive(Debug, Clone)]
pub struct VariantResolution {
    pub kind: ProductKind,
    pub variants: Vec<Variant>,
    /// Canonical attribute slug → normalized option values, page order.
    pub attribute_values: BTreeMap<String, Vec<String>>,
    /// Default selection per variation attribute, from the donor's active
    /// option.
    pub default_options: BTreeMap<String, String>,
    /// Strategy that produced the variants; `None` for simple products.
    pub strategy: Option<StrategyKind>,
    pub warnings: Vec<String>,
}

impl VariantResolution {
    fn simple() -> Self {
        Self {
            kind: ProductKind::Simple,
            variants: Vec::new(),
            attribute_values: BTreeMap::new(),
            default_options: BTreeMap::new(),
            strategy: None,
            warnings: Vec::new(),
        }
    }
}

enum StrategyOutcome {
    /// Probes per option, parallel to the option list.
    Resolved(Vec<OptionProbe>),
    Escalate(String),
}

/// Resolves per-variant data for one product page.
pub struct VariantResolver<'a> {
    profile: &'a Profile,
    source: &'a dyn PageSource,
}

impl<'a> VariantResolver<'a> {
    #[must_use]
    pub fn new(profile: &'a Profile, source: &'a dyn PageSource) -> Self {
        Self { profile, source }
    }

    /// Resolves the variants for the page at `url`.
    ///
    /// `options` and `partial_form` come from the already-parsed initial
    /// page; `parent` carries the page-level fields used to fill gaps in
    /// per-option probes.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::NoOptionsFound`] when the profile declares the donor
    /// variable-capable but the page exposes no options. Strategy failures
    /// are not errors; they surface as a downgrade warning.
    pub async fn resolve(
        &self,
        url: &str,
        options: &[ExtractedOption],
        partial_form: Option<&PartialFormInfo>,
        parent: &ParentFields,
    ) -> Result<VariantResolution, ScrapeError> {
        let mut warnings = Vec::new();
        let options = collapse_duplicate_labels(options, &mut warnings);

        if options.is_empty() {
            if self.profile.variations.variable_capable {
                return Err(ScrapeError::NoOptionsFound {
                    url: url.to_owned(),
                });
            }
            let mut resolution = VariantResolution::simple();
            resolution.warnings = warnings;
            return Ok(resolution);
        }

        let slug = self.attribute_slug();
        if options.len() < 2 {
            // A single purchasable option is not a variation, but its value
            // still belongs on the product as a plain attribute.
            let mut resolution = VariantResolution::simple();
            if let Some(only) = options.first() {
                let value = self.profile.attributes.normalize_value(&slug, &only.label);
                resolution.attribute_values.insert(slug, vec![value]);
            }
            resolution.warnings = warnings;
            return Ok(resolution);
        }

        for strategy in self.applicable_strategies(&options, partial_form) {
            tracing::debug!(url, strategy = %strategy, "probing variation strategy");
            let outcome = match strategy {
                StrategyKind::PartialFetch => {
                    // applicable_strategies guarantees the form is present.
                    let Some(form) = partial_form else { continue };
                    self.probe_partial(form, &options, &mut warnings).await?
                }
                StrategyKind::DirectUrl => {
                    self.probe_direct(url, &options, &mut warnings).await?
                }
                StrategyKind::RenderedInteraction => {
                    self.probe_rendered(url, &options, &mut warnings).await?
                }
            };

            match outcome {
                StrategyOutcome::Resolved(probes) => {
                    tracing::debug!(url, strategy = %strategy, "variation strategy accepted");
                    return Ok(self.build_resolution(
                        &slug, &options, &probes, parent, strategy, warnings,
                    ));
                }
                StrategyOutcome::Escalate(reason) => {
                    tracing::debug!(url, strategy = %strategy, reason, "escalating past strategy");
                }
            }
        }

        warnings.push(format!(
            "could not distinguish variant data for {} option(s); treating product as simple",
            options.len()
        ));
        tracing::warn!(url, options = options.len(), "variant strategies exhausted, downgrading");
        let mut resolution = VariantResolution::simple();
        resolution.warnings = warnings;
        Ok(resolution)
    }

    fn attribute_slug(&self) -> String {
        self.profile
            .variations
            .attribute
            .as_deref()
            .map_or_else(|| "pa_option".to_owned(), |name| self.profile.attributes.slug_for(name))
    }

    fn applicable_strategies(
        &self,
        options: &[ExtractedOption],
        partial_form: Option<&PartialFormInfo>,
    ) -> Vec<StrategyKind> {
        let mut strategies = Vec::new();
        if partial_form.is_some() {
            strategies.push(StrategyKind::PartialFetch);
        }
        let has_option_urls = options.iter().any(|o| o.url.is_some());
        if has_option_urls || self.profile.variations.url_pattern.is_some() {
            strategies.push(StrategyKind::DirectUrl);
        }
        if self.profile.variations.render_option.is_some() {
            strategies.push(StrategyKind::RenderedInteraction);
        }
        strategies
    }

    async fn probe_partial(
        &self,
        form: &PartialFormInfo,
        options: &[ExtractedOption],
        warnings: &mut Vec<String>,
    ) -> Result<StrategyOutcome, ScrapeError> {
        let mut probes = Vec::with_capacity(options.len());
        for option in options {
            let Some(value) = option.value.as_deref() else {
                probes.push(OptionProbe::default());
                continue;
            };
            let token = OptionToken {
                param: form.param.clone(),
                value: value.to_owned(),
            };
            match self.source.fetch_partial(&form.action_url, &token).await {
                Ok(body) => probes.push(self.parse_partial_body(&body)),
                Err(err) => {
                    warnings.push(format!(
                        "partial fetch failed for option '{}': {err}",
                        option.label
                    ));
                    probes.push(OptionProbe::default());
                }
            }
        }
        Ok(accept_or_escalate(probes, "partial responses are indistinguishable"))
    }

    async fn probe_direct(
        &self,
        base_page_url: &str,
        options: &[ExtractedOption],
        warnings: &mut Vec<String>,
    ) -> Result<StrategyOutcome, ScrapeError> {
        let pattern = self
            .profile
            .variations
            .url_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ScrapeError::InvalidUrl {
                url: base_page_url.to_owned(),
                reason: format!("bad url_pattern in profile: {e}"),
            })?;

        let mut probes = Vec::with_capacity(options.len());
        for option in options {
            let target = option.url.clone().or_else(|| {
                pattern
                    .as_ref()
                    .and_then(|re| substitute_url_number(re, base_page_url, &option.label))
            });
            let Some(target) = target else {
                probes.push(OptionProbe::default());
                continue;
            };
            if target == base_page_url {
                // The active option links back to the page we already have.
                probes.push(OptionProbe::default());
                continue;
            }
            match self.source.fetch(&target).await {
                Ok(html) => probes.push(self.probe_from_page(&html)),
                Err(err) => {
                    warnings.push(format!(
                        "direct fetch failed for option '{}' at {target}: {err}",
                        option.label
                    ));
                    probes.push(OptionProbe::default());
                }
            }
        }
        Ok(accept_or_escalate(probes, "per-option pages are indistinguishable"))
    }

    async fn probe_rendered(
        &self,
        url: &str,
        options: &[ExtractedOption],
        warnings: &mut Vec<String>,
    ) -> Result<StrategyOutcome, ScrapeError> {
        let Some(template) = self.profile.variations.render_option.as_deref() else {
            return Ok(StrategyOutcome::Escalate(
                "no render_option selector configured".to_owned(),
            ));
        };

        let mut probes = Vec::with_capacity(options.len());
        for option in options {
            let target_value = option.value.as_deref().unwrap_or(&option.label);
            let option_selector = template.replace("{value}", target_value);
            match self.source.render_and_select(url, &option_selector).await {
                Ok(html) => probes.push(self.probe_from_page(&html)),
                Err(ScrapeError::RenderUnsupported) => {
                    return Ok(StrategyOutcome::Escalate(
                        "page source has no rendering capability".to_owned(),
                    ));
                }
                Err(err @ ScrapeError::RenderTimeout { .. }) => {
                    warnings.push(format!(
                        "rendered selection timed out for option '{}': {err}",
                        option.label
                    ));
                    probes.push(OptionProbe::default());
                }
                Err(err) => {
                    warnings.push(format!(
                        "rendered selection failed for option '{}': {err}",
                        option.label
                    ));
                    probes.push(OptionProbe::default());
                }
            }
        }
        // Last resort: there is nothing left to escalate to, so whatever
        // the rendered session observed stands.
        Ok(StrategyOutcome::Resolved(probes))
    }

    /// Parses a partial-content response, JSON first, HTML fragment as a
    /// fallback.
    fn parse_partial_body(&self, body: &str) -> OptionProbe {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
            let probe = self.probe_from_json(&json);
            if !probe.is_empty() {
                return probe;
            }
            // Some donors wrap an HTML fragment in a JSON envelope.
            if let Some(fragment) = json
                .get("html")
                .or_else(|| json.get("content"))
                .and_then(serde_json::Value::as_str)
            {
                return self.probe_from_fragment(fragment);
            }
            return OptionProbe::default();
        }
        self.probe_from_fragment(body)
    }

    fn probe_from_json(&self, json: &serde_json::Value) -> OptionProbe {
        let price = pick_str(json, &["price", "regular_price", "new_price"])
            .and_then(|s| extract::parse_price(&s))
            .or_else(|| {
                pick_str(json, &["price_html"]).and_then(|s| extract::parse_price(&s))
            });
        let sale_price = pick_str(json, &["sale_price", "special_price"])
            .and_then(|s| extract::parse_price(&s));
        let sku = pick_str(json, &["sku", "article", "code"]).map(|s| self.strip_sku_prefix(&s));
        let image = pick_str(json, &["image", "image_url", "img"])
            .map(|s| extract::absolutize(&self.profile.site.base_url, &s));
        OptionProbe {
            price,
            sale_price,
            sku,
            image,
        }
    }

    fn probe_from_fragment(&self, fragment: &str) -> OptionProbe {
        let doc = Html::parse_fragment(fragment);
        self.probe_from_doc(&doc)
    }

    fn probe_from_page(&self, html: &str) -> OptionProbe {
        let doc = Html::parse_document(html);
        self.probe_from_doc(&doc)
    }

    fn probe_from_doc(&self, doc: &Html) -> OptionProbe {
        let selectors = &self.profile.selectors;
        let price = selectors
            .price_regular
            .as_deref()
            .and_then(|css| extract::extract_price(doc, css));
        let sale_price = selectors
            .price_sale
            .as_deref()
            .and_then(|css| extract::extract_price(doc, css));
        let sku = extract::extract_sku(doc, selectors);
        let image = selectors.gallery_images.as_deref().and_then(|css| {
            extract::extract_images(doc, css, &self.profile.site.base_url)
                .into_iter()
                .next()
                .map(|i| i.url)
        });
        OptionProbe {
            price,
            sale_price,
            sku,
            image,
        }
    }

    fn strip_sku_prefix(&self, raw: &str) -> String {
        let stripped = match &self.profile.selectors.sku_strip_prefix {
            Some(prefix) => raw.strip_prefix(prefix.as_str()).unwrap_or(raw),
            None => raw,
        };
        stripped.trim().to_owned()
    }

    fn build_resolution(
        &self,
        slug: &str,
        options: &[ExtractedOption],
        probes: &[OptionProbe],
        parent: &ParentFields,
        strategy: StrategyKind,
        warnings: Vec<String>,
    ) -> VariantResolution {
        let mut values = Vec::with_capacity(options.len());
        let mut variants = Vec::with_capacity(options.len());
        let mut default_options = BTreeMap::new();

        for (option, probe) in options.iter().zip(probes) {
            let value = self.profile.attributes.normalize_value(slug, &option.label);
            if option.is_active {
                default_options.insert(slug.to_owned(), value.clone());
            }
            variants.push(Variant {
                option_key: OptionKey::from_pairs([(slug.to_owned(), value.clone())]),
                price: probe.price.or(parent.price),
                sale_price: probe.sale_price.or(parent.sale_price),
                sku: probe.sku.clone().or_else(|| parent.sku.clone()),
                image: probe.image.clone().or_else(|| parent.image.clone()),
            });
            values.push(value);
        }

        let mut attribute_values = BTreeMap::new();
        attribute_values.insert(slug.to_owned(), values);

        VariantResolution {
            kind: ProductKind::Variable,
            variants,
            attribute_values,
            default_options,
            strategy: Some(strategy),
            warnings,
        }
    }
}

/// Keeps the last occurrence of each duplicate label, preserving the
/// position of the first.
fn collapse_duplicate_labels(
    options: &[ExtractedOption],
    warnings: &mut Vec<String>,
) -> Vec<ExtractedOption> {
    let mut collapsed: Vec<ExtractedOption> = Vec::with_capacity(options.len());
    for option in options {
        if let Some(existing) = collapsed.iter_mut().find(|o| o.label == option.label) {
            warnings.push(format!(
                "duplicate option label '{}'; keeping the last occurrence",
                option.label
            ));
            *existing = option.clone();
        } else {
            collapsed.push(option.clone());
        }
    }
    collapsed
}

/// Accepts the probe set when at least two options look different from one
/// another; identical probes across the board mean the strategy produced
/// no variant-level signal.
fn accept_or_escalate(probes: Vec<OptionProbe>, reason: &str) -> StrategyOutcome {
    let mut distinct: Vec<&OptionProbe> = Vec::new();
    for probe in &probes {
        if !distinct.contains(&probe) {
            distinct.push(probe);
        }
    }
    if distinct.len() >= 2 {
        StrategyOutcome::Resolved(probes)
    } else {
        StrategyOutcome::Escalate(reason.to_owned())
    }
}

fn pick_str(json: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let v = json.get(key)?;
        match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

/// Replaces the captured number in `url` with the digits found in `label`.
fn substitute_url_number(re: &Regex, url: &str, label: &str) -> Option<String> {
    static DIGITS: std::sync::LazyLock<Regex> =
        std::sync::LazyLock::new(|| Regex::new(r"\d+").expect("hard-coded regex"));

    let digits = DIGITS.find(label)?.as_str();
    let captures = re.captures(url)?;
    let group = captures.get(1)?;
    let mut out = String::with_capacity(url.len());
    out.push_str(&url[..group.start()]);
    out.push_str(digits);
    out.push_str(&url[group.end()..]);
    Some(out)
}
