//! xml2csv - summarise TEI XML papers into a CSV file
//!
//! ```bash
//! # parse papers/*.xml and write ./summary.csv
//! xml2csv papers .
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use paperharvest::summary::{self, DEFAULT_SUMMARY_FILE};
use paperharvest::{logging, tei};
use std::path::PathBuf;

/// Extract ID, DOI, title, date, keywords, abstract and language from TEI XML files
#[derive(Parser)]
#[command(name = "xml2csv")]
#[command(version, about, long_about = None)]
#[command(after_help = "Example: xml2csv papers .")]
struct Cli {
    /// XML file, or directory whose *.xml files are read
    input_path: PathBuf,

    /// Directory for the CSV file (created if missing)
    output_dir: PathBuf,

    /// Name of the CSV file
    #[arg(default_value = DEFAULT_SUMMARY_FILE)]
    output_filename: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);

    if !cli.input_path.exists() {
        eprintln!("{} is not a valid path", cli.input_path.display());
        eprintln!("Usage: xml2csv <INPUT_PATH> <OUTPUT_DIR> [OUTPUT_FILENAME]");
        std::process::exit(2);
    }

    std::fs::create_dir_all(&cli.output_dir).context("Failed to create output directory")?;

    let inputs = tei::collect_inputs(&cli.input_path).context("Failed to list XML files")?;
    println!("Processing {} XML files...", inputs.len());

    let report = tei::extract_all(&inputs);

    let output = cli.output_dir.join(&cli.output_filename);
    summary::write_summary(&output, &report.records).context("Failed to write CSV")?;

    println!("Saved {} rows to {}", report.records.len(), output.display());
    for (path, error) in &report.failed {
        println!("  skipped {}: {}", path.display(), error);
    }

    Ok(())
}
