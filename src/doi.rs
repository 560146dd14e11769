//! DOI link resolution.
//!
//! doi.org answers a request for Crossref metadata with a `Link` header that
//! lists alternate representations of the work, e.g.
//!
//! ```text
//! <https://pub.example/x.pdf>; version="vor"; type="application/pdf"; rel="item",
//! <https://pub.example/x>; version="vor"; rel="item"
//! ```
//!
//! The best candidate download URL is picked from that header.

use crate::crossref::{CrossrefClient, UNIXSD_ACCEPT};
use crate::error::{HarvestError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, LINK};
use tracing::debug;

/// Version-of-record entry typed as a PDF
static PDF_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(http[^>]*)>;\s*version="vor";\s*type="application/pdf""#)
        .expect("valid PDF link regex")
});

/// Version-of-record item entry, sometimes a PDF
static ITEM_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(http[^>]*)>;\s*version="vor";\s*rel="item""#).expect("valid item link regex")
});

/// Which tier of the selection produced a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Explicit `type="application/pdf"` entry
    Pdf,
    /// `rel="item"` entry, not guaranteed to be a PDF
    Item,
    /// No usable entry; the resolver URL itself
    Resolver,
}

/// Candidate download URL for a DOI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub url: String,
    pub kind: LinkKind,
}

/// Resolver URL for a DOI, e.g. `https://doi.org/10.1000/xyz`.
///
/// Each `/`-separated segment is percent-encoded, so characters such as `#`
/// and `?` in SICI-style DOIs stay part of the path.
pub fn resolver_url(base: &str, doi: &str) -> String {
    let path = doi
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Output filename for a DOI: slashes become underscores, `.pdf` appended
pub fn pdf_filename(doi: &str) -> String {
    format!("{}.pdf", doi.replace('/', "_"))
}

/// Pick the best candidate from a `Link` header value.
///
/// Order: PDF entry, then item entry, then `fallback` unchanged.
pub fn select_link(link_header: &str, fallback: &str) -> ResolvedLink {
    if let Some(url) = capture_url(&PDF_LINK, link_header) {
        return ResolvedLink { url, kind: LinkKind::Pdf };
    }

    if let Some(url) = capture_url(&ITEM_LINK, link_header) {
        return ResolvedLink { url, kind: LinkKind::Item };
    }

    ResolvedLink {
        url: fallback.to_string(),
        kind: LinkKind::Resolver,
    }
}

fn capture_url(re: &Regex, header: &str) -> Option<String> {
    re.captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Ask the resolver about `doi` and select a download link.
///
/// Transport errors and non-success statuses are returned to the caller.
pub async fn resolve(client: &CrossrefClient, doi: &str) -> Result<ResolvedLink> {
    let url = resolver_url(&client.options().resolver_url, doi);

    let response = client
        .http()
        .get(&url)
        .header(ACCEPT, UNIXSD_ACCEPT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Api {
            code: status.as_u16(),
            message: format!("DOI resolver error for {}: {}", doi, status),
        });
    }

    let header = response
        .headers()
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join(", ");

    let link = select_link(&header, &url);
    debug!(doi = %doi, kind = ?link.kind, url = %link.url, "Resolved link");
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "https://doi.org/10.1000/xyz";

    #[test]
    fn test_pdf_entry_wins_regardless_of_position() {
        let header = concat!(
            r#"<https://pub.example/article/xyz>; version="vor"; rel="item", "#,
            r#"<https://pub.example/xyz.pdf>; version="vor"; type="application/pdf"; rel="item", "#,
            r#"<https://pub.example/xyz.xml>; version="vor"; type="text/xml"; rel="item""#
        );
        let link = select_link(header, FALLBACK);
        assert_eq!(link.url, "https://pub.example/xyz.pdf");
        assert_eq!(link.kind, LinkKind::Pdf);

        let first = r#"<https://pub.example/first.pdf>; version="vor"; type="application/pdf""#;
        assert_eq!(select_link(first, FALLBACK).url, "https://pub.example/first.pdf");
    }

    #[test]
    fn test_item_entry_is_second_choice() {
        let header = concat!(
            r#"<https://pub.example/xyz.xml>; version="tdm"; type="text/xml", "#,
            r#"<https://pub.example/article/xyz>; version="vor"; rel="item""#
        );
        let link = select_link(header, FALLBACK);
        assert_eq!(link.url, "https://pub.example/article/xyz");
        assert_eq!(link.kind, LinkKind::Item);
    }

    #[test]
    fn test_falls_back_to_resolver_url() {
        let header = r#"<https://pub.example/xyz.xml>; version="am"; type="application/pdf""#;
        assert_eq!(
            select_link(header, FALLBACK),
            ResolvedLink {
                url: FALLBACK.to_string(),
                kind: LinkKind::Resolver,
            }
        );
        assert_eq!(select_link("", FALLBACK).url, FALLBACK);
    }

    #[test]
    fn test_pdf_filename() {
        assert_eq!(pdf_filename("10.1007/s00134-020-05991-x"), "10.1007_s00134-020-05991-x.pdf");
        assert_eq!(pdf_filename("10.1000/a/b"), "10.1000_a_b.pdf");
    }

    #[test]
    fn test_resolver_url() {
        assert_eq!(resolver_url("https://doi.org", "10.1/x"), "https://doi.org/10.1/x");
        assert_eq!(resolver_url("https://doi.org/", "10.1/x"), "https://doi.org/10.1/x");
    }

    #[test]
    fn test_resolver_url_encodes_reserved_characters() {
        let sici = "10.1002/(SICI)1097-4636(199706)35:4<463::AID-JBM6>3.0.CO;2-#";
        assert_eq!(
            resolver_url("https://doi.org", sici),
            "https://doi.org/10.1002/%28SICI%291097-4636%28199706%2935%3A4%3C463%3A%3AAID-JBM6%3E3.0.CO%3B2-%23"
        );
        assert_eq!(resolver_url("https://doi.org", "10.1/a?b"), "https://doi.org/10.1/a%3Fb");
        assert_eq!(resolver_url("https://doi.org", "10.1/a/b"), "https://doi.org/10.1/a/b");
    }
}
