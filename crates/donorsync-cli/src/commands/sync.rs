use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{stream, StreamExt};

use donorsync_catalog::{Reconciler, RestCatalogClient, SyncOutcome, SyncReport};
use donorsync_core::{external_id_from_url, AppConfig, Ledger, Profile};
use donorsync_ledger::SqliteLedger;
use donorsync_scraper::{scrape_product, PageSource};

pub struct BatchOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    pub skip_synced: bool,
    pub max_concurrent: Option<usize>,
    pub publish: bool,
}

fn status(config: &AppConfig, publish: bool) -> &str {
    if publish {
        "publish"
    } else {
        &config.default_status
    }
}

/// Scrapes one product page and reconciles it remotely.
pub async fn push_one(
    config: &AppConfig,
    profile: &Profile,
    url: &str,
    publish: bool,
) -> Result<()> {
    let source = super::page_source(config)?;
    let client = RestCatalogClient::new(config)?;
    let ledger = SqliteLedger::open(&config.ledger_path).await?;
    let reconciler = Reconciler::new(&client, &ledger, status(config, publish));

    let report = process(&source, profile, &reconciler, url).await?;
    print_report(&report);
    Ok(())
}

/// Pushes every product URL listed in `file`, concurrently up to the
/// configured limit. Ctrl-C stops picking up new products; work already in
/// flight runs to completion.
pub async fn push_batch(
    config: &AppConfig,
    profile: &Profile,
    file: &Path,
    options: &BatchOptions,
) -> Result<()> {
    let source = super::page_source(config)?;
    let client = RestCatalogClient::new(config)?;
    let ledger = SqliteLedger::open(&config.ledger_path).await?;
    let reconciler = Reconciler::new(&client, &ledger, status(config, options.publish));

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("reading url list {}", file.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .skip(options.offset)
        .take(options.limit.unwrap_or(usize::MAX))
        .collect();
    tracing::info!(count = urls.len(), file = %file.display(), "starting batch push");

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = Arc::clone(&cancelled);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, finishing in-flight products");
                cancelled.store(true, Ordering::SeqCst);
            }
        });
    }

    let source_ref = &source;
    let ledger_ref: &dyn Ledger = &ledger;
    let reconciler_ref = &reconciler;
    let cancelled_ref = &cancelled;
    let skip_synced = options.skip_synced;
    let total = urls.len();

    let results: Vec<BatchResult> = stream::iter(urls)
        .map(|url| async move {
            if cancelled_ref.load(Ordering::SeqCst) {
                return BatchResult::Skipped;
            }
            if skip_synced {
                let external_id = external_id_from_url(&url);
                match ledger_ref.get_product(&external_id).await {
                    Ok(Some(_)) => {
                        tracing::debug!(external_id, "already synced, skipping");
                        return BatchResult::Skipped;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::error!(external_id, error = %err, "ledger lookup failed");
                        return BatchResult::Failed;
                    }
                }
            }
            match process(source_ref, profile, reconciler_ref, &url).await {
                Ok(report) => {
                    print_report(&report);
                    BatchResult::Synced(report.outcome)
                }
                Err(err) => {
                    tracing::error!(url, error = %err, "product push failed");
                    BatchResult::Failed
                }
            }
        })
        .buffer_unordered(
            options
                .max_concurrent
                .unwrap_or(config.max_concurrent_products)
                .max(1),
        )
        .collect()
        .await;

    let mut created = 0usize;
    let mut updated = 0usize;
    let mut recreated = 0usize;
    let mut partial = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for result in &results {
        match result {
            BatchResult::Synced(SyncOutcome::Created) => created += 1,
            BatchResult::Synced(SyncOutcome::Updated) => updated += 1,
            BatchResult::Synced(SyncOutcome::Recreated) => recreated += 1,
            BatchResult::Synced(SyncOutcome::Partial) => partial += 1,
            BatchResult::Skipped => skipped += 1,
            BatchResult::Failed => failed += 1,
        }
    }

    println!(
        "batch finished: {created} created, {updated} updated, {recreated} recreated, \
         {partial} partial, {skipped} skipped, {failed} failed"
    );
    if failed > 0 {
        anyhow::bail!("{failed} of {total} products failed");
    }
    Ok(())
}

enum BatchResult {
    Synced(SyncOutcome),
    Skipped,
    Failed,
}

async fn process(
    source: &dyn PageSource,
    profile: &Profile,
    reconciler: &Reconciler<'_>,
    url: &str,
) -> Result<SyncReport> {
    let scraped = scrape_product(source, profile, url).await?;
    for warning in &scraped.warnings {
        tracing::warn!(external_id = %scraped.product.external_id, "{warning}");
    }
    let report = reconciler.sync_product(&scraped.product).await?;
    Ok(report)
}

fn print_report(report: &SyncReport) {
    println!(
        "{} -> remote {} ({:?}): {} variants created, {} updated, {} unchanged",
        report.external_id,
        report.remote_product_id,
        report.outcome,
        report.variants_created,
        report.variants_updated,
        report.variants_unchanged,
    );
    for failure in &report.variant_failures {
        eprintln!("  variant failed: {failure}");
    }
    for warning in &report.warnings {
        eprintln!("  note: {warning}");
    }
}
