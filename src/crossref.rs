//! Crossref API client and works search.
//!
//! This module owns the shared HTTP client used by every stage of the PDF
//! harvest and turns a free-text query into an ordered list of DOIs.

use crate::error::{HarvestError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Crossref works search, restricted to journal articles
pub const CROSSREF_WORKS_URL: &str = "https://api.crossref.org/types/journal-article/works";

/// Canonical DOI resolver
pub const DOI_RESOLVER_URL: &str = "https://doi.org";

/// Accept header asking the resolver for unified Crossref XML metadata
pub const UNIXSD_ACCEPT: &str = "application/vnd.crossref.unixsd+xml";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint and identity settings for [`CrossrefClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Works search endpoint
    pub search_url: String,
    /// DOI resolver base URL (no trailing slash)
    pub resolver_url: String,
    /// Contact address for the Crossref polite pool
    pub mailto: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            search_url: CROSSREF_WORKS_URL.to_string(),
            resolver_url: DOI_RESOLVER_URL.to_string(),
            mailto: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// HTTP client for the Crossref API, the DOI resolver and publisher downloads
pub struct CrossrefClient {
    client: reqwest::Client,
    options: ClientOptions,
}

impl CrossrefClient {
    /// Create a new CrossrefClient
    pub fn new(options: ClientOptions) -> Result<Self> {
        let user_agent = match &options.mailto {
            Some(mailto) => format!("paperharvest/{} (mailto:{})", env!("CARGO_PKG_VERSION"), mailto),
            None => format!("paperharvest/{}", env!("CARGO_PKG_VERSION")),
        };

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(options.timeout)
            .build()
            .map_err(|e| HarvestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    /// Underlying reqwest client
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Search journal articles and return their DOIs in response order.
    ///
    /// `query` holds comma-separated terms which Crossref treats as
    /// alternatives. A single page of at most `rows` items is requested.
    pub async fn search_dois(&self, query: &str, rows: u32) -> Result<Vec<String>> {
        let terms = query_terms(query);
        if terms.is_empty() {
            return Err(HarvestError::Validation("Query has no search terms".to_string()));
        }

        let rows = rows.to_string();
        let mut params: Vec<(&str, &str)> = vec![("query", terms.as_str()), ("rows", rows.as_str())];
        if let Some(mailto) = self.options.mailto.as_deref() {
            params.push(("mailto", mailto));
        }

        debug!(url = %self.options.search_url, query = %terms, rows = %rows, "Searching Crossref");

        let response = self
            .client
            .get(&self.options.search_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Api {
                code: status.as_u16(),
                message: format!("Crossref API error: {}", status),
            });
        }

        let body = response.text().await?;
        let dois = parse_works_response(&body)?;

        info!(query = %terms, found = dois.len(), "Crossref search complete");
        Ok(dois)
    }
}

/// Turn `lions, tigers` into `lions tigers`; reqwest encodes the space as
/// `+`, which Crossref reads as OR.
pub fn query_terms(query: &str) -> String {
    query
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// === Crossref API Response Types ===

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<WorkItem>,
}

#[derive(Debug, Deserialize)]
struct WorkItem {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
}

/// Extract DOIs from a works response body, skipping items without one
fn parse_works_response(body: &str) -> Result<Vec<String>> {
    let data: WorksResponse = serde_json::from_str(body)?;

    Ok(data
        .message
        .items
        .into_iter()
        .filter_map(|item| item.doi)
        .map(|doi| doi.trim().to_string())
        .filter(|doi| !doi.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_terms() {
        assert_eq!(query_terms("lions,tigers"), "lions tigers");
        assert_eq!(query_terms(" lions , , tigers "), "lions tigers");
        assert_eq!(query_terms("deep learning"), "deep learning");
        assert_eq!(query_terms(",,"), "");
    }

    #[test]
    fn test_parse_works_response_preserves_order() -> Result<()> {
        let body = r#"{
            "status": "ok",
            "message": {
                "total-results": 3,
                "items": [
                    {"DOI": "10.1000/b", "title": ["B"]},
                    {"title": ["no doi"]},
                    {"DOI": "10.1000/a"}
                ]
            }
        }"#;

        let dois = parse_works_response(body)?;
        assert_eq!(dois, vec!["10.1000/b".to_string(), "10.1000/a".to_string()]);
        Ok(())
    }

    #[test]
    fn test_parse_works_response_without_items() -> Result<()> {
        let dois = parse_works_response(r#"{"message": {}}"#)?;
        assert!(dois.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_works_response_rejects_garbage() {
        assert!(matches!(
            parse_works_response("<html>"),
            Err(HarvestError::Json(_))
        ));
    }
}
