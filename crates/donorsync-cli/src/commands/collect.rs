use std::path::Path;

use anyhow::{Context, Result};

use donorsync_core::{AppConfig, Profile};
use donorsync_scraper::collect_product_urls;

/// Walks the listing and writes one product URL per line, to a file or
/// stdout.
pub async fn run(
    config: &AppConfig,
    profile: &Profile,
    listing_url: &str,
    out: Option<&Path>,
    limit: Option<usize>,
    offset: usize,
) -> Result<()> {
    let source = super::page_source(config)?;
    // The listing is walked front to back, so the offset has to be
    // collected before it can be skipped.
    let fetch_limit = limit.map(|l| l + offset);
    let urls: Vec<String> = collect_product_urls(&source, profile, listing_url, fetch_limit)
        .await?
        .into_iter()
        .skip(offset)
        .collect();
    tracing::info!(count = urls.len(), listing_url, "collected product urls");

    match out {
        Some(path) => {
            let mut content = urls.join("\n");
            content.push('\n');
            std::fs::write(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{} urls written to {}", urls.len(), path.display());
        }
        None => {
            for url in urls {
                println!("{url}");
            }
        }
    }
    Ok(())
}
