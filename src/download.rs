//! PDF fetching.
//!
//! [`fetch_pdf`] guarantees a PDF exists at the target path or reports why it
//! could not. Existing files are trusted and never re-fetched.

use std::path::{Path, PathBuf};

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info};

const PDF_MIME: &str = "application/pdf";

/// Successful result of [`fetch_pdf`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The body was fetched and written
    Downloaded { path: PathBuf, bytes: usize },
    /// A file was already present; nothing was fetched
    AlreadyPresent { path: PathBuf },
}

impl DownloadOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Downloaded { path, .. } | DownloadOutcome::AlreadyPresent { path } => path,
        }
    }
}

/// Why a download failed
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Publisher answered with a non-success status (forbidden, paywall, ...)
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The link did not resolve to a PDF
    #[error("Link did not resolve to pdf (content-type: {content_type})")]
    NotPdf { content_type: String },

    /// Transport failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Short reason code for logs and reports
    pub fn reason(&self) -> &'static str {
        match self {
            DownloadError::HttpStatus { .. } => "http_status",
            DownloadError::NotPdf { .. } => "not_pdf",
            DownloadError::Network(_) => "network",
            DownloadError::Io(_) => "io",
        }
    }
}

/// MIME essence of a `Content-Type` value: parameters dropped, lowercased
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Make sure `target` holds a PDF fetched from `link`.
///
/// Returns [`DownloadOutcome::AlreadyPresent`] without any request when the
/// file exists. Otherwise the link is fetched and the body is written only if
/// the response is typed `application/pdf`.
pub async fn fetch_pdf(
    client: &reqwest::Client,
    link: &str,
    target: &Path,
) -> Result<DownloadOutcome, DownloadError> {
    if target.is_file() {
        debug!(path = %target.display(), "Already downloaded");
        return Ok(DownloadOutcome::AlreadyPresent {
            path: target.to_path_buf(),
        });
    }

    let response = client.get(link).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            status: status.as_u16(),
            url: link.to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if mime_essence(&content_type) != PDF_MIME {
        return Err(DownloadError::NotPdf { content_type });
    }

    let body = response.bytes().await?;
    std::fs::write(target, &body)?;

    info!(path = %target.display(), bytes = body.len(), "Saved PDF");
    Ok(DownloadOutcome::Downloaded {
        path: target.to_path_buf(),
        bytes: body.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_essence() {
        assert_eq!(mime_essence("application/pdf"), "application/pdf");
        assert_eq!(mime_essence("Application/PDF; charset=binary"), "application/pdf");
        assert_eq!(mime_essence("text/html;charset=UTF-8"), "text/html");
        assert_eq!(mime_essence(""), "");
    }

    #[test]
    fn test_reason_codes() {
        let not_pdf = DownloadError::NotPdf {
            content_type: "text/html".to_string(),
        };
        assert_eq!(not_pdf.reason(), "not_pdf");
        assert!(not_pdf.to_string().contains("text/html"));

        let status = DownloadError::HttpStatus {
            status: 403,
            url: "https://pub.example/x.pdf".to_string(),
        };
        assert_eq!(status.reason(), "http_status");
        assert_eq!(status.to_string(), "HTTP 403 from https://pub.example/x.pdf");
    }

    #[tokio::test]
    async fn test_existing_file_is_not_fetched() -> Result<(), DownloadError> {
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("10.1000_x.pdf");
        std::fs::write(&target, b"%PDF-1.4")?;

        // Unroutable link: any request would fail
        let client = reqwest::Client::new();
        let outcome = fetch_pdf(&client, "http://127.0.0.1:9/never", &target).await?;

        assert_eq!(outcome, DownloadOutcome::AlreadyPresent { path: target.clone() });
        assert_eq!(std::fs::read(&target)?, b"%PDF-1.4");
        Ok(())
    }
}
