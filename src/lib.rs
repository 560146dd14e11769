//! # paperharvest
//!
//! Two small pipelines for collecting academic papers:
//!
//! - **PDF harvest**: search Crossref, resolve each DOI to a likely PDF link
//!   and download it under a publisher-friendly rate limit.
//! - **Metadata summary**: read TEI XML documents and write one CSV row per
//!   paper with its DOI, title, date, keywords, abstract and language.
//!
//! ## Modules
//!
//! - [`crossref`] - HTTP client and works search
//! - [`doi`] - DOI → download link resolution
//! - [`rate_limit`] - request spacing and hourly download budget
//! - [`download`] - PDF fetching with content-type validation
//! - [`harvest`] - sequential batch over DOIs, failure logs
//! - [`tei`] - TEI XML field extraction and language detection
//! - [`summary`] - CSV output
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paperharvest::crossref::{ClientOptions, CrossrefClient};
//! use paperharvest::harvest::{self, HarvestOptions};
//! use paperharvest::rate_limit::RateLimiter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = CrossrefClient::new(ClientOptions::default())?;
//!     let dois = client.search_dois("lions,tigers", 10).await?;
//!     let mut limiter = RateLimiter::publisher_policy();
//!     let report = harvest::run(&client, &mut limiter, &HarvestOptions::new("pdfs"), &dois).await?;
//!     println!("{} downloaded", report.downloaded());
//!     Ok(())
//! }
//! ```

pub mod crossref;
pub mod doi;
pub mod download;
pub mod error;
pub mod harvest;
pub mod logging;
pub mod rate_limit;
pub mod summary;
pub mod tei;

pub use error::{HarvestError, Result};
