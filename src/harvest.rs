//! Sequential PDF harvest over a list of DOIs.
//!
//! Each DOI is resolved to a candidate link and fetched, with both requests
//! throttled through the [`RateLimiter`]. A failing DOI never stops the batch: it is
//! written to the error log and collected for `humanNeeded.txt`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::crossref::CrossrefClient;
use crate::doi::{self, LinkKind};
use crate::download::{self, DownloadOutcome};
use crate::error::Result;
use crate::rate_limit::RateLimiter;

/// Failures needing manual follow-up, overwritten each run
pub const HUMAN_NEEDED_FILE: &str = "humanNeeded.txt";

/// Default name of the append-only error log
pub const ERROR_LOG_FILE: &str = "getCrossrefPdfs.err";

/// Where a batch writes its artifacts
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Directory receiving the PDFs and `humanNeeded.txt`
    pub output_dir: PathBuf,
    /// Error log path
    pub error_log: PathBuf,
}

impl HarvestOptions {
    /// Options with the error log inside `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        let error_log = output_dir.join(ERROR_LOG_FILE);
        Self { output_dir, error_log }
    }

    pub fn human_needed_path(&self) -> PathBuf {
        self.output_dir.join(HUMAN_NEEDED_FILE)
    }
}

/// How one DOI ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Downloaded { bytes: usize },
    /// File already on disk, no request made
    Skipped,
    Failed { reason: String, message: String },
}

/// One DOI's journey through the batch
#[derive(Debug, Clone)]
pub struct DownloadRecord {
    pub doi: String,
    pub link: String,
    pub kind: Option<LinkKind>,
    pub outcome: Outcome,
}

/// Summary of a finished batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub records: Vec<DownloadRecord>,
}

impl BatchReport {
    pub fn downloaded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Downloaded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    /// Records whose download failed, in input order
    pub fn failures(&self) -> impl Iterator<Item = &DownloadRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.records.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Append-only diagnostic log, reopened for every entry
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line describing a failed DOI
    pub fn append(&self, doi: &str, link: &str, error: &str) -> Result<()> {
        self.write_line(&format!(
            "Encountered error while downloading {} ({}): {}",
            link, doi, error
        ))
    }

    /// Append one line describing a failed Crossref search
    pub fn append_search(&self, query: &str, error: &str) -> Result<()> {
        self.write_line(&format!("Crossref search failed for '{}': {}", query, error))
    }

    fn write_line(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), message)?;
        Ok(())
    }
}

/// Write the `doi<TAB>link` list of failures, replacing any previous file
pub fn write_human_needed(path: &Path, report: &BatchReport) -> Result<()> {
    let mut content = String::new();
    for record in report.failures() {
        content.push_str(&record.doi);
        content.push('\t');
        content.push_str(&record.link);
        content.push('\n');
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Leave the run's artifacts behind when the search never produced DOIs:
/// the error is appended to the error log and an empty `humanNeeded.txt`
/// is written.
pub fn record_search_failure(options: &HarvestOptions, query: &str, error: &str) -> Result<()> {
    FailureLog::new(&options.error_log).append_search(query, error)?;
    write_human_needed(&options.human_needed_path(), &BatchReport::default())
}

/// Harvest PDFs for `dois` into `options.output_dir`.
///
/// Per-DOI failures are recorded, logged and collected; only failing to
/// write `humanNeeded.txt` aborts the call.
pub async fn run(
    client: &CrossrefClient,
    limiter: &mut RateLimiter,
    options: &HarvestOptions,
    dois: &[String],
) -> Result<BatchReport> {
    let log = FailureLog::new(&options.error_log);
    let mut report = BatchReport::default();

    info!(total = dois.len(), output = %options.output_dir.display(), "Starting PDF harvest");

    for (idx, doi) in dois.iter().enumerate() {
        let target = options.output_dir.join(doi::pdf_filename(doi));

        if target.is_file() {
            info!(doi = %doi, "Already downloaded, skipping");
            report.records.push(DownloadRecord {
                doi: doi.clone(),
                link: String::new(),
                kind: None,
                outcome: Outcome::Skipped,
            });
            continue;
        }

        let record = harvest_one(client, limiter, doi, &target, &log).await;
        if let Outcome::Failed { reason, message } = &record.outcome {
            warn!(
                doi = %doi,
                link = %record.link,
                reason = %reason,
                error = %message,
                "Download failed"
            );
        }
        report.records.push(record);

        if (idx + 1) % 10 == 0 {
            info!(done = idx + 1, total = dois.len(), "Harvest progress");
        }
    }

    write_human_needed(&options.human_needed_path(), &report)?;

    info!(
        downloaded = report.downloaded(),
        skipped = report.skipped(),
        failed = report.failed(),
        "Harvest complete"
    );
    Ok(report)
}

async fn harvest_one(
    client: &CrossrefClient,
    limiter: &mut RateLimiter,
    doi: &str,
    target: &Path,
    log: &FailureLog,
) -> DownloadRecord {
    limiter.pace().await;
    let resolved = match doi::resolve(client, doi).await {
        Ok(link) => link,
        Err(e) => {
            let link = doi::resolver_url(&client.options().resolver_url, doi);
            return failed(log, doi, link, None, "resolution", e.to_string());
        }
    };

    limiter.acquire().await;

    match download::fetch_pdf(client.http(), &resolved.url, target).await {
        Ok(fetched) => {
            debug!(doi = %doi, path = %fetched.path().display(), "PDF on disk");
            let outcome = match fetched {
                DownloadOutcome::Downloaded { bytes, .. } => Outcome::Downloaded { bytes },
                DownloadOutcome::AlreadyPresent { .. } => Outcome::Skipped,
            };
            DownloadRecord {
                doi: doi.to_string(),
                link: resolved.url,
                kind: Some(resolved.kind),
                outcome,
            }
        }
        Err(e) => failed(log, doi, resolved.url, Some(resolved.kind), e.reason(), e.to_string()),
    }
}

fn failed(
    log: &FailureLog,
    doi: &str,
    link: String,
    kind: Option<LinkKind>,
    reason: &str,
    message: String,
) -> DownloadRecord {
    if let Err(e) = log.append(doi, &link, &message) {
        warn!(path = %log.path().display(), error = %e, "Could not write error log");
    }

    DownloadRecord {
        doi: doi.to_string(),
        link,
        kind,
        outcome: Outcome::Failed {
            reason: reason.to_string(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(doi: &str, outcome: Outcome) -> DownloadRecord {
        DownloadRecord {
            doi: doi.to_string(),
            link: format!("https://pub.example/{}", doi),
            kind: Some(LinkKind::Item),
            outcome,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            records: vec![
                record("a", Outcome::Downloaded { bytes: 10 }),
                record("b", Outcome::Skipped),
                record(
                    "c",
                    Outcome::Failed {
                        reason: "not_pdf".to_string(),
                        message: "nope".to_string(),
                    },
                ),
            ],
        };
        assert_eq!(report.downloaded(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.failures().map(|r| r.doi.as_str()).collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_human_needed_is_overwritten() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(HUMAN_NEEDED_FILE);
        std::fs::write(&path, "stale\n")?;

        let report = BatchReport {
            records: vec![record(
                "10.1/x",
                Outcome::Failed {
                    reason: "network".to_string(),
                    message: "boom".to_string(),
                },
            )],
        };
        write_human_needed(&path, &report)?;

        assert_eq!(std::fs::read_to_string(&path)?, "10.1/x\thttps://pub.example/10.1/x\n");
        Ok(())
    }

    #[test]
    fn test_failure_log_appends() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let log = FailureLog::new(dir.path().join("run.err"));

        log.append("10.1/a", "https://pub.example/a", "first")?;
        log.append("10.1/b", "https://pub.example/b", "second")?;

        let content = std::fs::read_to_string(log.path())?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("Encountered error while downloading https://pub.example/a (10.1/a): first"));
        assert!(lines[1].contains("(10.1/b): second"));
        Ok(())
    }

    #[test]
    fn test_search_failure_leaves_artifacts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let options = HarvestOptions::new(dir.path());
        std::fs::write(options.human_needed_path(), "10.1/old\thttps://old.example\n")?;

        record_search_failure(&options, "lions,tigers", "HTTP 503")?;

        assert_eq!(std::fs::read_to_string(options.human_needed_path())?, "");
        let log = std::fs::read_to_string(&options.error_log)?;
        assert_eq!(log.lines().count(), 1);
        assert!(log.trim_end().ends_with("Crossref search failed for 'lions,tigers': HTTP 503"));
        Ok(())
    }

    #[test]
    fn test_options_paths() {
        let options = HarvestOptions::new("/tmp/pdfs");
        assert_eq!(options.error_log, PathBuf::from("/tmp/pdfs/getCrossrefPdfs.err"));
        assert_eq!(options.human_needed_path(), PathBuf::from("/tmp/pdfs/humanNeeded.txt"));
    }
}
