//! adstxt-opt command line entry point.
//!
//! Thin surface over the optimizer engine: optimize an ads.txt file, or
//! query cached sellers.json metadata and targeted seller lookups.
//! Logging goes to stderr so stdout stays pipeable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use adstxt_core::{AppConfig, CacheDb, ResourceType};
use adstxt_client::DomainResourceCache;
use adstxt_client::fetch::{FetchClient, FetchConfig};
use adstxt_optimizer::{OptimizationLevel, Optimizer};

#[derive(Parser)]
#[command(name = "adstxt-opt", version, about = "ads.txt optimizer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize an ads.txt file against sellers.json data.
    Optimize {
        /// Path to the ads.txt file to optimize.
        file: PathBuf,

        /// Publisher domain hint passed to the parser.
        #[arg(long)]
        publisher_domain: Option<String>,

        /// Optimization level: "level1" (normalize/dedupe) or "level2"
        /// (full sellers.json classification).
        #[arg(long, default_value = "level2")]
        level: String,

        /// Write output to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch a publisher's ads.txt through the cache and print it.
    Fetch {
        domain: String,
    },

    /// Print sellers.json metadata and summary counts for a domain.
    Meta {
        domain: String,
    },

    /// Look up specific seller ids in a domain's sellers.json.
    Lookup {
        domain: String,

        /// Seller/account ids to look up.
        #[arg(required = true)]
        account_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))?;

    let fetcher = Arc::new(FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?);

    let ads_txt_ttl = config.ads_txt_ttl();
    let cache = DomainResourceCache::new(db.clone(), Arc::clone(&fetcher));
    let optimizer = Optimizer::new(db, fetcher, config);

    match cli.command {
        Command::Optimize { file, publisher_domain, level, output } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let level: OptimizationLevel = level.parse()?;

            let report = optimizer
                .optimize(&content, publisher_domain.as_deref(), level)
                .await?;

            tracing::info!(
                original_length = report.original_length,
                optimized_length = report.optimized_length,
                level = %report.optimization_level,
                "optimization complete"
            );
            if let Some(categories) = &report.categories {
                tracing::info!(
                    other = categories.other,
                    confidential = categories.confidential,
                    missing_seller_id = categories.missing_seller_id,
                    no_seller_json = categories.no_seller_json,
                    "record categories"
                );
            }

            match output {
                Some(path) => std::fs::write(&path, &report.optimized_content)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{}", report.optimized_content),
            }
        }

        Command::Fetch { domain } => {
            let record = cache.get_or_fetch(ResourceType::AdsTxt, &domain, ads_txt_ttl).await?;
            match record.content {
                Some(content) => println!("{content}"),
                None => bail!(
                    "ads.txt fetch for {domain} failed: {}{}",
                    record.status,
                    record
                        .error_message
                        .map(|m| format!(" ({m})"))
                        .unwrap_or_default()
                ),
            }
        }

        Command::Meta { domain } => {
            let result = optimizer.accessor().get_metadata_and_summary(&domain).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Lookup { domain, account_ids } => {
            let result = optimizer.accessor().batch_get_sellers(&domain, &account_ids).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
