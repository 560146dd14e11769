//! crossref-pdfs - download journal-article PDFs found by a Crossref search
//!
//! ```bash
//! # up to 100 articles about lions and/or tigers, saved in ./pdfs
//! crossref-pdfs lions,tigers ./pdfs 100
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use paperharvest::crossref::{ClientOptions, CrossrefClient};
use paperharvest::harvest::{self, HarvestOptions};
use paperharvest::logging;
use paperharvest::rate_limit::RateLimiter;
use std::path::PathBuf;
use tracing::warn;

/// Download PDFs for journal articles matching a Crossref query
#[derive(Parser)]
#[command(name = "crossref-pdfs")]
#[command(version, about, long_about = None)]
#[command(after_help = "Example: crossref-pdfs lions,tigers . 100")]
struct Cli {
    /// Search terms, comma-separated terms are OR-ed
    query_string: String,

    /// Directory for the PDFs (created if missing)
    output_dir: PathBuf,

    /// Maximum number of search results
    #[arg(value_name = "MAX_RESULTS")]
    max_results: u32,

    /// Contact address sent to Crossref for the polite pool
    #[arg(long)]
    mailto: Option<String>,

    /// Error log (default: <OUTPUT_DIR>/getCrossrefPdfs.err)
    #[arg(long)]
    error_log: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    std::fs::create_dir_all(&cli.output_dir).context("Failed to create output directory")?;

    let client = CrossrefClient::new(ClientOptions {
        mailto: cli.mailto,
        ..Default::default()
    })?;

    let mut options = HarvestOptions::new(&cli.output_dir);
    if let Some(path) = cli.error_log {
        options.error_log = path;
    }

    let dois = match client.search_dois(&cli.query_string, cli.max_results).await {
        Ok(dois) => dois,
        Err(e) => {
            if let Err(log_err) = harvest::record_search_failure(&options, &cli.query_string, &e.to_string()) {
                warn!(error = %log_err, "Could not record search failure");
            }
            return Err(e).context("Crossref search failed");
        }
    };

    println!("Found {} articles on Crossref.", dois.len());

    let mut limiter = RateLimiter::publisher_policy();
    let report = harvest::run(&client, &mut limiter, &options, &dois).await?;

    println!(
        "Downloaded: {}, already present: {}, failed: {}",
        report.downloaded(),
        report.skipped(),
        report.failed()
    );
    if report.failed() > 0 {
        println!(
            "Links needing a human are listed in {}",
            options.human_needed_path().display()
        );
    }

    Ok(())
}
