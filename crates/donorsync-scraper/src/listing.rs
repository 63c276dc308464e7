//! Listing-page traversal: collects product URLs across paginated
//! category pages.

use scraper::Html;

use donorsync_core::profile::Profile;

use crate::error::ScrapeError;
use crate::extract::{self, absolutize};
use crate::page_source::PageSource;

/// Hard cap on pages walked per listing; donors with broken "next" links
/// can otherwise loop forever.
const MAX_PAGES: usize = 200;

/// Walks a paginated listing starting at `listing_url` and returns product
/// URLs in discovery order, deduplicated. Stops at the first page without
/// a next-page link, when `limit` URLs are collected, or at the page cap.
///
/// # Errors
///
/// Fails on fetch errors, an invalid profile selector, or when the page
/// cap is exceeded.
pub async fn collect_product_urls(
    source: &dyn PageSource,
    profile: &Profile,
    listing_url: &str,
    limit: Option<usize>,
) -> Result<Vec<String>, ScrapeError> {
    let Some(link_css) = profile.listing.product_link.as_deref() else {
        return Err(ScrapeError::InvalidSelector {
            selector: "listing.product_link (not configured)".to_owned(),
        });
    };

    let mut urls = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut page_url = listing_url.to_owned();

    for page_index in 0.. {
        if page_index >= MAX_PAGES {
            return Err(ScrapeError::PaginationLimit {
                url: listing_url.to_owned(),
                max_pages: MAX_PAGES,
            });
        }

        let html = source.fetch(&page_url).await?;
        let (links, next) = parse_listing_page(&html, link_css, profile)?;
        tracing::debug!(page = page_index + 1, url = %page_url, links = links.len(), "listing page walked");

        for link in links {
            if seen.insert(link.clone()) {
                urls.push(link);
            }
            if limit.is_some_and(|l| urls.len() >= l) {
                return Ok(urls);
            }
        }

        match next {
            // Donors sometimes link "next" back to the current page on the
            // last one.
            Some(next_url) if next_url != page_url => page_url = next_url,
            _ => break,
        }
    }

    Ok(urls)
}

/// Parses one listing page into (product links, next-page link).
fn parse_listing_page(
    html: &str,
    link_css: &str,
    profile: &Profile,
) -> Result<(Vec<String>, Option<String>), ScrapeError> {
    let doc = Html::parse_document(html);
    let link_sel = extract::selector(link_css)?;
    let base = &profile.site.base_url;

    let links = doc
        .select(&link_sel)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| absolutize(base, href))
        .collect();

    let next = match profile.listing.next_page.as_deref() {
        Some(css) => {
            let next_sel = extract::selector(css)?;
            doc.select(&next_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .map(|href| absolutize(base, href))
        }
        None => None,
    };

    Ok((links, next))
}
