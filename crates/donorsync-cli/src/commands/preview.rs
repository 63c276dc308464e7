use anyhow::Result;

use donorsync_core::{AppConfig, Product, ProductKind, Profile};
use donorsync_scraper::scrape_product;

/// Scrapes one product page and prints the canonical record as JSON.
/// Nothing is written remotely.
pub async fn run(config: &AppConfig, profile: &Profile, url: &str) -> Result<()> {
    let source = super::page_source(config)?;
    let scraped = scrape_product(&source, profile, url).await?;

    for warning in &scraped.warnings {
        tracing::warn!(url, "{warning}");
    }
    println!("{}", serde_json::to_string_pretty(&scraped.product)?);
    Ok(())
}

/// Scrapes one product page and checks the fields a push would need.
pub async fn validate(config: &AppConfig, profile: &Profile, url: &str) -> Result<()> {
    let source = super::page_source(config)?;
    let scraped = scrape_product(&source, profile, url).await?;

    for warning in &scraped.warnings {
        tracing::warn!(url, "{warning}");
    }

    let problems = check_required_fields(&scraped.product);
    if problems.is_empty() {
        println!("{}: ok ({:?})", scraped.product.external_id, scraped.product.kind);
        return Ok(());
    }
    for problem in &problems {
        eprintln!("{}: {problem}", scraped.product.external_id);
    }
    anyhow::bail!("{} required field(s) missing", problems.len());
}

fn check_required_fields(product: &Product) -> Vec<String> {
    let mut problems = Vec::new();

    match product.kind {
        ProductKind::Simple => {
            if product.base_price.is_none() {
                problems.push("no price extracted".to_owned());
            }
        }
        ProductKind::Variable => {
            if product.variants.is_empty() {
                problems.push("variable product has no variants".to_owned());
            }
            if product.variants.iter().any(|v| v.price.is_none()) {
                problems.push("variant without a price".to_owned());
            }
        }
    }
    if product.images.is_empty() {
        problems.push("no images extracted".to_owned());
    }
    if product.categories.is_empty() {
        problems.push("no categories resolved".to_owned());
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use donorsync_core::ImageRef;

    fn simple_product() -> Product {
        Product {
            external_id: "soap".to_owned(),
            title: "Soap".to_owned(),
            sku: None,
            description_html: None,
            kind: ProductKind::Simple,
            base_price: Some("45".parse().unwrap()),
            sale_price: None,
            images: vec![ImageRef {
                url: "https://donor.example/img/soap.jpg".to_owned(),
                alt: None,
            }],
            attributes: BTreeMap::new(),
            default_options: BTreeMap::new(),
            categories: vec![donorsync_core::CategoryNode {
                display_name: "Мило".to_owned(),
                slug: "mylo".to_owned(),
            }],
            brand: None,
            variants: vec![],
        }
    }

    #[test]
    fn complete_product_passes() {
        assert!(check_required_fields(&simple_product()).is_empty());
    }

    #[test]
    fn missing_price_and_images_are_reported() {
        let mut product = simple_product();
        product.base_price = None;
        product.images.clear();
        let problems = check_required_fields(&product);
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn variable_product_without_variants_fails() {
        let mut product = simple_product();
        product.kind = ProductKind::Variable;
        let problems = check_required_fields(&product);
        assert!(problems.iter().any(|p| p.contains("no variants")));
    }
}
