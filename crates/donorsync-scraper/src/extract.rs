//! DOM field extraction.
//!
//! All functions here are synchronous and operate on an already-parsed
//! [`scraper::Html`]. The document type is not `Send`, so callers parse
//! inside a sync scope and never hold a document across an await point.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};

use donorsync_core::product::ImageRef;
use donorsync_core::profile::{SelectorSection, VariationSection};

use crate::error::ScrapeError;

/// One option element extracted from a variation widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedOption {
    /// Visible option label, trimmed.
    pub label: String,
    /// Donor-side value token (from `value` / `data-value`), when present.
    pub value: Option<String>,
    /// Absolute per-option URL (from `href`), when present.
    pub url: Option<String>,
    /// Whether the donor page marks this option as currently selected.
    pub is_active: bool,
}

/// The AJAX form backing the partial-fetch strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFormInfo {
    /// Absolute URL the form posts to.
    pub action_url: String,
    /// Form parameter name carrying the option value.
    pub param: String,
}

pub(crate) fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::InvalidSelector {
        selector: css.to_owned(),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_owned()
}

/// Extracts the product title; a missing title is an extraction error.
pub(crate) fn extract_title(doc: &Html, css: &str) -> Result<String, ScrapeError> {
    let sel = selector(css)?;
    let text = doc.select(&sel).next().map(element_text);
    match text {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(ScrapeError::SelectorMismatch {
            selector: css.to_owned(),
            context: "product title".to_owned(),
        }),
    }
}

/// Extracts the SKU, stripping the donor's label prefix when configured.
/// Absent or empty SKUs are not errors.
pub(crate) fn extract_sku(doc: &Html, selectors: &SelectorSection) -> Option<String> {
    let css = selectors.sku.as_deref()?;
    let sel = selector(css).ok()?;
    let raw = doc.select(&sel).next().map(element_text)?;
    let stripped = match &selectors.sku_strip_prefix {
        Some(prefix) => raw.strip_prefix(prefix.as_str()).unwrap_or(&raw),
        None => raw.as_str(),
    };
    let sku = stripped.trim().to_owned();
    (!sku.is_empty()).then_some(sku)
}

/// Parses a donor-formatted price string into a [`Decimal`].
///
/// Handles currency suffixes, thousands spacing (regular and non-breaking),
/// and comma decimal separators. Returns `None` when no numeric value can
/// be recovered.
pub(crate) fn parse_price(text: &str) -> Option<Decimal> {
    static NUMERIC: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\d][\d\s\u{a0}.,]*").expect("hard-coded regex"));

    let run = NUMERIC.find(text)?.as_str();
    let mut cleaned: String = run
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    cleaned = cleaned.replace(',', ".");
    // More than one dot means the earlier ones were thousands separators.
    if let Some(last) = cleaned.rfind('.') {
        let (head, tail) = cleaned.split_at(last);
        cleaned = format!("{}{}", head.replace('.', ""), tail);
    }
    cleaned.trim_end_matches('.').parse::<Decimal>().ok()
}

/// Extracts and parses a price field. Missing prices are not errors; the
/// donor may show prices only per variant.
pub(crate) fn extract_price(doc: &Html, css: &str) -> Option<Decimal> {
    let sel = selector(css).ok()?;
    let text = doc.select(&sel).next().map(element_text)?;
    parse_price(&text)
}

/// Extracts the description block as sanitized HTML.
pub(crate) fn extract_description(doc: &Html, css: &str) -> Option<String> {
    let sel = selector(css).ok()?;
    let inner = doc.select(&sel).next().map(|el| el.inner_html())?;
    let sanitized = sanitize_description_html(&inner);
    (!sanitized.trim().is_empty()).then_some(sanitized)
}

/// Strips donor markup that must not reach the remote catalog: script and
/// style blocks, inline `style` attributes, presentational `font` wrappers,
/// and empty paragraphs left behind by the donor's editor.
pub(crate) fn sanitize_description_html(html: &str) -> String {
    static SCRIPT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("hard-coded regex"));
    static STYLE_BLOCK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("hard-coded regex"));
    static STYLE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)\s+style\s*=\s*("[^"]*"|'[^']*')"#).expect("hard-coded regex")
    });
    static FONT_TAG: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</?font[^>]*>").expect("hard-coded regex"));
    static EMPTY_P: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)<p[^>]*>(\s|&nbsp;)*</p>").expect("hard-coded regex")
    });

    let html = SCRIPT.replace_all(html, "");
    let html = STYLE_BLOCK.replace_all(&html, "");
    let html = STYLE_ATTR.replace_all(&html, "");
    let html = FONT_TAG.replace_all(&html, "");
    let html = EMPTY_P.replace_all(&html, "");
    html.trim().to_owned()
}

/// Extracts the image gallery in page order, absolutized against the donor
/// base URL and deduplicated by URL.
pub(crate) fn extract_images(doc: &Html, css: &str, base_url: &str) -> Vec<ImageRef> {
    let Ok(sel) = selector(css) else {
        return Vec::new();
    };
    let mut seen = std::collections::HashSet::new();
    let mut images = Vec::new();
    for el in doc.select(&sel) {
        let src = el
            .value()
            .attr("data-src")
            .or_else(|| el.value().attr("src"))
            .or_else(|| el.value().attr("href"));
        let Some(src) = src else { continue };
        let url = absolutize(base_url, src);
        if seen.insert(url.clone()) {
            images.push(ImageRef {
                url,
                alt: el.value().attr("alt").map(str::to_owned),
            });
        }
    }
    images
}

/// Extracts the breadcrumb display names in trail order.
pub(crate) fn extract_breadcrumbs(doc: &Html, selectors: &SelectorSection) -> Vec<String> {
    let Some(css) = selectors.breadcrumbs.as_deref() else {
        return Vec::new();
    };
    let Ok(crumb_sel) = selector(css) else {
        return Vec::new();
    };
    let name_sel = selectors
        .breadcrumb_name
        .as_deref()
        .and_then(|s| selector(s).ok());

    doc.select(&crumb_sel)
        .map(|crumb| match &name_sel {
            Some(sel) => crumb
                .select(sel)
                .next()
                .map_or_else(|| element_text(crumb), element_text),
            None => element_text(crumb),
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Extracts the variation options, filtering configured placeholder labels.
///
/// # Errors
///
/// [`ScrapeError::InvalidSelector`] when a profile selector fails to parse.
pub(crate) fn extract_options(
    doc: &Html,
    variations: &VariationSection,
    base_url: &str,
) -> Result<Vec<ExtractedOption>, ScrapeError> {
    let Some(css) = variations.options.as_deref() else {
        return Ok(Vec::new());
    };
    let option_sel = selector(css)?;

    let active_ids: std::collections::HashSet<_> = match variations.active.as_deref() {
        Some(active_css) => {
            let active_sel = selector(active_css)?;
            doc.select(&active_sel).map(|el| el.id()).collect()
        }
        None => std::collections::HashSet::new(),
    };

    let placeholders: Vec<String> = variations
        .placeholder_labels
        .iter()
        .map(|l| l.to_lowercase())
        .collect();

    let mut options = Vec::new();
    for el in doc.select(&option_sel) {
        let label = element_text(el);
        if label.is_empty() || placeholders.contains(&label.to_lowercase()) {
            continue;
        }
        let value = el
            .value()
            .attr("data-value")
            .or_else(|| el.value().attr("value"))
            .map(str::to_owned);
        let url = el
            .value()
            .attr("href")
            .map(|href| absolutize(base_url, href));
        options.push(ExtractedOption {
            label,
            value,
            url,
            is_active: active_ids.contains(&el.id()),
        });
    }
    Ok(options)
}

/// Locates the AJAX variation form, when the profile declares one.
///
/// The action URL comes from the form's `data-action` or `action`
/// attribute; the parameter name from the profile override or the first
/// named `select`/`input` inside the form.
pub(crate) fn extract_partial_form(
    doc: &Html,
    variations: &VariationSection,
    base_url: &str,
) -> Option<PartialFormInfo> {
    let css = variations.partial_form.as_deref()?;
    let form_sel = selector(css).ok()?;
    let form = doc.select(&form_sel).next()?;

    let action = form
        .value()
        .attr("data-action")
        .or_else(|| form.value().attr("action"))?;

    let param = variations.partial_param.clone().or_else(|| {
        let input_sel = selector("select[name], input[name]").ok()?;
        form.select(&input_sel)
            .next()
            .and_then(|el| el.value().attr("name"))
            .map(str::to_owned)
    })?;

    Some(PartialFormInfo {
        action_url: absolutize(base_url, action),
        param,
    })
}

/// Resolves `href` against the donor base URL. Already-absolute URLs pass
/// through untouched; unparseable input falls back to the raw string.
pub(crate) fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_owned();
    }
    reqwest::Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map_or_else(|_| href.to_owned(), |u| u.to_string())
}
