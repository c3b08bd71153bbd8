//! Bibliographic collaborator: arXiv Atom search adapter.
//!
//! The workflow only depends on the [`PaperSource`] contract — a query in,
//! zero or more normalized [`PaperMetadata`] out, caller picks one by
//! index. This adapter queries the arXiv export API and walks its Atom
//! feed; swapping in another bibliographic service means implementing the
//! trait, nothing more.

use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::record::PaperMetadata;

const ARXIV_QUERY_URL: &str = "http://export.arxiv.org/api/query";

/// Source of reference papers for a term query.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Search for papers relevant to `query`, newest-relevance first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperMetadata>>;
}

/// arXiv export API client.
pub struct ArxivSource {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ArxivSource {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: ARXIV_QUERY_URL.to_string(),
        }
    }
}

impl ArxivSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl PaperSource for ArxivSource {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<PaperMetadata>> {
        debug!(query, max_results, "arxiv search");
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", format!("all:{query}")),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await
            .context("arxiv request failed")?
            .error_for_status()
            .context("arxiv returned an error status")?;
        let body = response.text().await.context("arxiv response body")?;
        parse_atom_feed(&body)
    }
}

/// Which text node is currently being captured inside an `<entry>`.
#[derive(PartialEq)]
enum Capture {
    Title,
    Summary,
}

/// Parse an arXiv Atom feed into normalized paper metadata.
///
/// Only `<entry>` children matter: `<title>`, `<summary>`, and the `term`
/// attribute of `<arxiv:primary_category>`. Entries without a primary
/// category get the literal domain `"None"`.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<PaperMetadata>> {
    let mut reader = Reader::from_str(xml);

    let mut papers = Vec::new();
    let mut in_entry = false;
    let mut capture: Option<Capture> = None;
    let mut title = String::new();
    let mut summary = String::new();
    let mut domain: Option<String> = None;

    loop {
        match reader.read_event().context("malformed atom feed")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    title.clear();
                    summary.clear();
                    domain = None;
                }
                b"title" if in_entry => capture = Some(Capture::Title),
                b"summary" if in_entry => capture = Some(Capture::Summary),
                b"primary_category" if in_entry => domain = category_term(&e),
                _ => capture = None,
            },
            Event::Empty(e) => {
                if in_entry && e.local_name().as_ref() == b"primary_category" {
                    domain = category_term(&e);
                }
            }
            Event::Text(t) => {
                if let Some(target) = &capture {
                    let text = t.unescape().context("malformed atom text")?;
                    match target {
                        Capture::Title => title.push_str(&text),
                        Capture::Summary => summary.push_str(&text),
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"entry" => {
                    in_entry = false;
                    papers.push(PaperMetadata::from_parts(
                        Some(title.trim().to_string()),
                        Some(summary.trim().to_string()),
                        domain.take(),
                    ));
                }
                b"title" | b"summary" => capture = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(papers)
}

fn category_term(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"term")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}
