//! arXiv Atom API adapter.
//!
//! Endpoint: http://export.arxiv.org/api/query
//!
//! The API returns an Atom feed; entries are parsed with a streaming
//! XML reader. The arXiv id is recovered from the entry's abs URL.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument, warn};

use paperscope_common::sandbox::SandboxClient as Client;
use paperscope_common::{Author, Paper, SearchError, SourceId};

use super::{unavailable, SearchFilters, SourceAdapter};

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivAdapter {
    client: Client,
}

impl ArxivAdapter {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self { client: Client::new()? })
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn id(&self) -> SourceId {
        SourceId::Arxiv
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        let params = [
            ("search_query", format!("all:{query}")),
            ("start", "0".to_string()),
            ("max_results", limit.to_string()),
            ("sortBy", "relevance".to_string()),
        ];

        let xml = self
            .client
            .get(ARXIV_API_URL)?
            .query(&params)
            .send()
            .await
            .map_err(|e| unavailable(SourceId::Arxiv, e))?
            .error_for_status()
            .map_err(|e| unavailable(SourceId::Arxiv, e))?
            .text()
            .await
            .map_err(|e| unavailable(SourceId::Arxiv, e))?;

        let papers = parse_atom_feed(&xml);
        debug!(count = papers.len(), "arXiv search returned entries");
        Ok(papers.into_iter().filter(|p| filters.matches(p)).collect())
    }
}

/// Parse an arXiv Atom feed into papers. Entries with no title are
/// skipped; a parse error ends the feed at whatever was recovered.
fn parse_atom_feed(xml: &str) -> Vec<Paper> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<Paper> = None;
    let mut in_title = false;
    let mut in_summary = false;
    let mut in_id = false;
    let mut in_published = false;
    let mut in_author_name = false;
    let mut in_journal_ref = false;
    let mut in_doi = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    current = Some(Paper {
                        title: String::new(),
                        authors: vec![],
                        year: None,
                        abstract_text: None,
                        citation_count: None,
                        venue: None,
                        doi: None,
                        pmid: None,
                        arxiv_id: None,
                        url: None,
                        source: SourceId::Arxiv,
                        impact_score: 0.0,
                    });
                }
                b"title"            => in_title = current.is_some(),
                b"summary"          => in_summary = true,
                b"id"               => in_id = current.is_some(),
                b"published"        => in_published = true,
                b"name"             => in_author_name = true,
                b"arxiv:journal_ref" => in_journal_ref = true,
                b"arxiv:doi"        => in_doi = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(ref mut p) = current {
                    if in_title {
                        // Titles may span folded lines in Atom output
                        p.title = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    }
                    if in_summary     { p.abstract_text = Some(text.trim().to_string()); }
                    if in_author_name { p.authors.push(Author::named(text.trim())); }
                    if in_journal_ref { p.venue = Some(text.trim().to_string()); }
                    if in_doi         { p.doi = Some(text.trim().to_string()); }
                    if in_published {
                        p.year = text.get(0..4).and_then(|y| y.parse::<i32>().ok());
                    }
                    if in_id {
                        let id = text.trim();
                        p.url = Some(id.to_string());
                        p.arxiv_id = Some(
                            id.rsplit("/abs/").next().unwrap_or(id).to_string(),
                        );
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"title"            => in_title = false,
                b"summary"          => in_summary = false,
                b"id"               => in_id = false,
                b"published"        => in_published = false,
                b"name"             => in_author_name = false,
                b"arxiv:journal_ref" => in_journal_ref = false,
                b"arxiv:doi"        => in_doi = false,
                b"entry" => {
                    if let Some(p) = current.take() {
                        if !p.title.is_empty() {
                            papers.push(p);
                        } else {
                            warn!("skipping Atom entry with empty title");
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Atom parse error: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    papers
}
