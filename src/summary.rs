//! CSV summary of extracted paper metadata.
//!
//! Missing values are kept as `None` in [`PaperRecord`] and only become the
//! literal `NA` when a row is written.

use serde::{Serialize, Serializer};
use std::path::Path;
use tracing::info;

use crate::error::Result;

/// Placeholder written for absent or empty fields
pub const MISSING: &str = "NA";

/// Default output file name
pub const DEFAULT_SUMMARY_FILE: &str = "summary.csv";

/// CSV column order for the summary
pub const SUMMARY_COLUMNS: &[&str] = &["ID", "DOI", "Title", "Date", "Keywords", "Abstract", "Language"];

/// One row of the summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    /// File-name derived ID, always present
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "DOI", serialize_with = "na_if_missing")]
    pub doi: Option<String>,
    #[serde(rename = "Title", serialize_with = "na_if_missing")]
    pub title: Option<String>,
    #[serde(rename = "Date", serialize_with = "na_if_missing")]
    pub date: Option<String>,
    /// Comma-separated keywords
    #[serde(rename = "Keywords", serialize_with = "na_if_missing")]
    pub keywords: Option<String>,
    #[serde(rename = "Abstract", serialize_with = "na_if_missing")]
    pub abstract_text: Option<String>,
    /// Detected language of the abstract
    #[serde(rename = "Language", serialize_with = "na_if_missing")]
    pub language: Option<String>,
}

fn na_if_missing<S: Serializer>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or(MISSING))
}

/// Write the header and one row per record, in order.
///
/// The header is written even when `records` is empty.
pub fn write_summary(path: &Path, records: &[PaperRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_path(path)?;

    wtr.write_record(SUMMARY_COLUMNS)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;

    info!(path = %path.display(), rows = records.len(), "Saved summary");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(false).from_path(path)?;
        let mut rows = Vec::new();
        for row in rdr.records() {
            rows.push(row?.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    #[test]
    fn test_missing_fields_written_as_na() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(DEFAULT_SUMMARY_FILE);

        let record = PaperRecord {
            id: "p1".to_string(),
            doi: Some("10.1/x".to_string()),
            title: None,
            date: None,
            keywords: None,
            abstract_text: None,
            language: None,
        };
        write_summary(&path, &[record])?;

        let rows = read_rows(&path)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], SUMMARY_COLUMNS);
        assert_eq!(rows[1], vec!["p1", "10.1/x", "NA", "NA", "NA", "NA", "NA"]);
        Ok(())
    }

    #[test]
    fn test_embedded_delimiters_are_quoted() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.csv");

        let record = PaperRecord {
            id: "p2".to_string(),
            doi: None,
            title: Some("Cats, dogs, and \"other\" pets".to_string()),
            date: Some("2020".to_string()),
            keywords: Some("cats,dogs".to_string()),
            abstract_text: Some("Line one\nLine two".to_string()),
            language: Some("en".to_string()),
        };
        write_summary(&path, &[record])?;

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.starts_with("ID,DOI,Title,Date,Keywords,Abstract,Language\n"));
        assert!(raw.contains("\"Cats, dogs, and \"\"other\"\" pets\""));

        let rows = read_rows(&path)?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], "Cats, dogs, and \"other\" pets");
        assert_eq!(rows[1][5], "Line one\nLine two");
        Ok(())
    }

    #[test]
    fn test_empty_batch_writes_header() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.csv");
        write_summary(&path, &[])?;
        assert_eq!(std::fs::read_to_string(&path)?, "ID,DOI,Title,Date,Keywords,Abstract,Language\n");
        Ok(())
    }
}
