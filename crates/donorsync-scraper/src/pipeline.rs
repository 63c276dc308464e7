//! Product page pipeline: fetch, extract, resolve variants, assemble the
//! canonical [`Product`].

use std::collections::BTreeMap;

use scraper::Html;

use donorsync_core::product::{
    external_id_from_url, AttributeValues, ImageRef, Product, ProductKind,
};
use donorsync_core::profile::Profile;

use crate::categories::resolve_categories;
use crate::error::ScrapeError;
use crate::extract::{self, ExtractedOption, PartialFormInfo};
use crate::page_source::PageSource;
use crate::variants::{ParentFields, VariantResolver};

/// A scraped product together with the non-fatal warnings collected along
/// the way (downgrades, per-option probe failures, duplicate labels).
#[derive(Debug, Clone)]
pub struct ScrapedProduct {
    pub product: Product,
    pub warnings: Vec<String>,
}

/// Everything extractable from the initial page HTML in one parse.
///
/// The parsed document never crosses an await point; this snapshot is what
/// the async pipeline carries instead.
struct PageSnapshot {
    title: String,
    sku: Option<String>,
    base_price: Option<rust_decimal::Decimal>,
    sale_price: Option<rust_decimal::Decimal>,
    description_html: Option<String>,
    images: Vec<ImageRef>,
    breadcrumbs: Vec<String>,
    options: Vec<ExtractedOption>,
    partial_form: Option<PartialFormInfo>,
}

fn snapshot(html: &str, profile: &Profile) -> Result<PageSnapshot, ScrapeError> {
    let doc = Html::parse_document(html);
    let selectors = &profile.selectors;
    let base = &profile.site.base_url;

    Ok(PageSnapshot {
        title: extract::extract_title(&doc, &selectors.title)?,
        sku: extract::extract_sku(&doc, selectors),
        base_price: selectors
            .price_regular
            .as_deref()
            .and_then(|css| extract::extract_price(&doc, css)),
        sale_price: selectors
            .price_sale
            .as_deref()
            .and_then(|css| extract::extract_price(&doc, css)),
        description_html: selectors
            .description
            .as_deref()
            .and_then(|css| extract::extract_description(&doc, css)),
        images: selectors
            .gallery_images
            .as_deref()
            .map(|css| extract::extract_images(&doc, css, base))
            .unwrap_or_default(),
        breadcrumbs: extract::extract_breadcrumbs(&doc, selectors),
        options: extract::extract_options(&doc, &profile.variations, base)?,
        partial_form: extract::extract_partial_form(&doc, &profile.variations, base),
    })
}

/// Scrapes one donor product page into a [`ScrapedProduct`].
///
/// # Errors
///
/// Fails on fetch errors, a missing title, an invalid profile selector, or
/// a variable-capable page with no options. Variant-strategy exhaustion is
/// NOT an error; it downgrades the product and adds a warning.
pub async fn scrape_product(
    source: &dyn PageSource,
    profile: &Profile,
    url: &str,
) -> Result<ScrapedProduct, ScrapeError> {
    let html = source.fetch(url).await?;
    let snap = snapshot(&html, profile)?;

    let parent = ParentFields {
        price: snap.base_price,
        sale_price: snap.sale_price,
        sku: snap.sku.clone(),
        image: snap.images.first().map(|i| i.url.clone()),
    };

    let resolver = VariantResolver::new(profile, source);
    let resolution = resolver
        .resolve(url, &snap.options, snap.partial_form.as_ref(), &parent)
        .await?;

    // On a simple product (single option, or downgraded) the attribute is
    // informational rather than a variation axis.
    let is_variation = resolution.kind == ProductKind::Variable;
    let mut attributes: BTreeMap<String, AttributeValues> = BTreeMap::new();
    for (slug, values) in &resolution.attribute_values {
        attributes.insert(
            slug.clone(),
            AttributeValues {
                values: values.clone(),
                is_variation,
            },
        );
    }

    let product = Product {
        external_id: external_id_from_url(url),
        title: snap.title,
        sku: snap.sku,
        description_html: snap.description_html,
        kind: resolution.kind,
        base_price: snap.base_price,
        sale_price: snap.sale_price,
        images: snap.images,
        attributes,
        default_options: resolution.default_options,
        categories: resolve_categories(&snap.breadcrumbs, &profile.categories),
        brand: profile.brand.clone(),
        variants: resolution.variants,
    };

    if product.kind == ProductKind::Variable {
        tracing::info!(
            external_id = %product.external_id,
            variants = product.variant_count(),
            strategy = ?resolution.strategy,
            "scraped variable product"
        );
    } else {
        tracing::info!(external_id = %product.external_id, "scraped simple product");
    }

    Ok(ScrapedProduct {
        product,
        warnings: resolution.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::page_source::OptionToken;

    struct FakeSite {
        pages: HashMap<String, String>,
        partials: HashMap<String, String>,
    }

    #[async_trait]
    impl PageSource for FakeSite {
        async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::NotFound {
                    url: url.to_owned(),
                })
        }

        async fn fetch_partial(
            &self,
            url: &str,
            token: &OptionToken,
        ) -> Result<String, ScrapeError> {
            self.partials
                .get(&format!("{url}|{}={}", token.param, token.value))
                .cloned()
                .ok_or_else(|| ScrapeError::NotFound {
                    url: url.to_owned(),
                })
        }

        async fn render_and_select(
            &self,
            _url: &str,
            _option_selector: &str,
        ) -> Result<String, ScrapeError> {
            Err(ScrapeError::RenderUnsupported)
        }
    }

    fn profile() -> Profile {
        serde_yaml::from_str(
            r#"
site:
  base_url: "https://donor.example"
selectors:
  title: "h1"
  sku: ".sku"
  sku_strip_prefix: "Артикул:"
  price_regular: ".price-regular"
  price_sale: ".price-sale"
  description: ".description"
  gallery_images: ".gallery img"
  breadcrumbs: ".crumb"
variations:
  options: ".option"
  active: ".option.active"
  attribute: "Обʼєм"
  placeholder_labels: ["будь-який"]
  partial_form: ".variant-form"
attributes:
  map:
    "Обʼєм": "pa_obyem"
  values:
    pa_obyem:
      "30 мл": "30 ml"
      "50 мл": "50 ml"
categories:
  exclude: ["Головна"]
  map:
    "Парфумерія": "perfumes"
brand: "CROOZ"
"#,
        )
        .expect("test profile should parse")
    }

    const VARIABLE_PAGE: &str = r#"
<html><body>
  <h1>Parfum Lux</h1>
  <div class="sku">Артикул: PL</div>
  <span class="price-regular">250 грн</span>
  <div class="description"><p>Аромат.</p></div>
  <div class="gallery"><img src="/img/pl.jpg"/></div>
  <ul><li class="crumb">Головна</li><li class="crumb">Парфумерія</li>
      <li class="crumb">Parfum Lux</li></ul>
  <form class="variant-form" data-action="/ajax" >
    <select name="opt"></select>
  </form>
  <a class="option active" data-value="153">30 мл</a>
  <a class="option" data-value="154">50 мл</a>
</body></html>
"#;

    #[tokio::test]
    async fn scrapes_variable_product_end_to_end() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://donor.example/p/parfum-lux/".to_owned(),
            VARIABLE_PAGE.to_owned(),
        );
        let mut partials = HashMap::new();
        partials.insert(
            "https://donor.example/ajax|opt=153".to_owned(),
            r#"{"price":"250","sku":"PL-30"}"#.to_owned(),
        );
        partials.insert(
            "https://donor.example/ajax|opt=154".to_owned(),
            r#"{"price":"390","sku":"PL-50"}"#.to_owned(),
        );
        let site = FakeSite { pages, partials };

        let scraped = scrape_product(
            &site,
            &profile(),
            "https://donor.example/p/parfum-lux/",
        )
        .await
        .unwrap();
        let product = &scraped.product;

        assert_eq!(product.external_id, "parfum-lux");
        assert_eq!(product.title, "Parfum Lux");
        assert_eq!(product.sku.as_deref(), Some("PL"));
        assert_eq!(product.kind, ProductKind::Variable);
        assert_eq!(product.base_price, Some(Decimal::new(250, 0)));
        assert_eq!(product.variants.len(), 2);
        assert_eq!(product.variants[1].sku.as_deref(), Some("PL-50"));
        assert_eq!(
            product.variants[1].image.as_deref(),
            Some("https://donor.example/img/pl.jpg"),
            "variants inherit the parent image when probes omit one"
        );
        assert_eq!(
            product.default_options.get("pa_obyem").map(String::as_str),
            Some("30 ml")
        );
        assert_eq!(product.categories.len(), 1);
        assert_eq!(product.categories[0].slug, "perfumes");
        assert_eq!(product.brand.as_deref(), Some("CROOZ"));
        assert!(
            product
                .attributes
                .get("pa_obyem")
                .is_some_and(|a| a.is_variation),
            "variation attribute recorded"
        );
        assert!(scraped.warnings.is_empty());
    }

    #[tokio::test]
    async fn page_without_options_is_simple() {
        let page = r#"
<html><body>
  <h1>Soap</h1>
  <span class="price-regular">45 грн</span>
</body></html>
"#;
        let mut pages = HashMap::new();
        pages.insert("https://donor.example/p/soap/".to_owned(), page.to_owned());
        let site = FakeSite {
            pages,
            partials: HashMap::new(),
        };

        let scraped = scrape_product(&site, &profile(), "https://donor.example/p/soap/")
            .await
            .unwrap();

        assert_eq!(scraped.product.kind, ProductKind::Simple);
        assert!(scraped.product.variants.is_empty());
    }

    #[tokio::test]
    async fn single_option_page_keeps_a_non_variation_attribute() {
        let page = r#"
<html><body>
  <h1>Parfum Mini</h1>
  <span class="price-regular">199 грн</span>
  <a class="option active" data-value="153">30 мл</a>
</body></html>
"#;
        let mut pages = HashMap::new();
        pages.insert(
            "https://donor.example/p/parfum-mini/".to_owned(),
            page.to_owned(),
        );
        let site = FakeSite {
            pages,
            partials: HashMap::new(),
        };

        let scraped = scrape_product(&site, &profile(), "https://donor.example/p/parfum-mini/")
            .await
            .unwrap();
        let product = &scraped.product;

        assert_eq!(product.kind, ProductKind::Simple);
        assert!(product.variants.is_empty());
        let attribute = product
            .attributes
            .get("pa_obyem")
            .expect("single-option attribute must be kept");
        assert_eq!(attribute.values, vec!["30 ml".to_owned()]);
        assert!(
            !attribute.is_variation,
            "a lone option is not a variation axis"
        );
    }

    #[tokio::test]
    async fn missing_title_fails_extraction() {
        let mut pages = HashMap::new();
        pages.insert(
            "https://donor.example/p/broken/".to_owned(),
            "<html><body></body></html>".to_owned(),
        );
        let site = FakeSite {
            pages,
            partials: HashMap::new(),
        };

        let err = scrape_product(&site, &profile(), "https://donor.example/p/broken/")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::SelectorMismatch { .. }));
    }
}
