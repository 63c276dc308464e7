//! `donorsync` command-line interface.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use donorsync_core::{load_app_config, load_profile, AppConfig, Profile};

#[derive(Parser)]
#[command(name = "donorsync", about = "Scrape donor product pages and sync them to the remote catalog", version)]
struct Cli {
    /// Path to the donor profile YAML.
    #[arg(long, global = true, default_value = "profile.yaml")]
    profile: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect product URLs from a paginated category listing.
    Collect {
        /// Listing URL to start from.
        #[arg(long)]
        from_category: String,
        /// Write URLs to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Stop after this many URLs.
        #[arg(long)]
        limit: Option<usize>,
        /// Skip this many URLs from the front of the listing.
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Scrape one product page and print it as JSON without pushing.
    Preview {
        /// Product page URL.
        #[arg(long)]
        url: String,
    },
    /// Scrape one product page and check that the required fields came
    /// out non-empty. No remote writes.
    Validate {
        /// Product page URL.
        #[arg(long)]
        url: String,
    },
    /// Scrape one product page and reconcile it against the remote
    /// catalog.
    Push {
        /// Product page URL.
        #[arg(long)]
        url: String,
        /// Publish immediately instead of the configured default status.
        #[arg(long)]
        publish: bool,
    },
    /// Push every product URL listed in a file, concurrently.
    PushBatch {
        /// File with one product URL per line.
        #[arg(long)]
        file: PathBuf,
        /// Stop after this many products.
        #[arg(long)]
        limit: Option<usize>,
        /// Skip this many URLs from the front of the file.
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Skip products the ledger already knows about.
        #[arg(long)]
        skip_synced: bool,
        /// Push everything, even ledger-known products (overrides
        /// --skip-synced).
        #[arg(long)]
        force: bool,
        /// Override the configured concurrency bound.
        #[arg(long)]
        max_concurrent: Option<usize>,
        /// Publish immediately instead of the configured default status.
        #[arg(long)]
        publish: bool,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_app_config()?;
    init_tracing(&config);

    let profile: Profile = load_profile(&cli.profile)?;
    tracing::debug!(profile = %cli.profile.display(), base_url = %profile.site.base_url, "profile loaded");

    match cli.command {
        Commands::Collect {
            from_category,
            out,
            limit,
            offset,
        } => commands::collect::run(&config, &profile, &from_category, out.as_deref(), limit, offset).await,
        Commands::Preview { url } => commands::preview::run(&config, &profile, &url).await,
        Commands::Validate { url } => commands::preview::validate(&config, &profile, &url).await,
        Commands::Push { url, publish } => {
            commands::sync::push_one(&config, &profile, &url, publish).await
        }
        Commands::PushBatch {
            file,
            limit,
            offset,
            skip_synced,
            force,
            max_concurrent,
            publish,
        } => {
            let options = commands::sync::BatchOptions {
                limit,
                offset,
                skip_synced: skip_synced && !force,
                max_concurrent,
                publish,
            };
            commands::sync::push_batch(&config, &profile, &file, &options).await
        }
    }
}
