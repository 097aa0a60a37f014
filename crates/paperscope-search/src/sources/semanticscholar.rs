//! Semantic Scholar Graph API adapter.
//!
//! Endpoint: https://api.semanticscholar.org/graph/v1/paper/search
//!
//! The richest general-purpose corpus we query: citation counts,
//! journal names, and external ids (DOI, PMID, arXiv) in one JSON
//! response. HTTP 429 is mapped to the rate-limit error rather than
//! `SourceUnavailable` so the caller backs off instead of writing the
//! source off.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use paperscope_common::sandbox::SandboxClient as Client;
use paperscope_common::{Author, Paper, SearchError, SourceId};

use super::{unavailable, SearchFilters, SourceAdapter};

const SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

const SEARCH_FIELDS: &str =
    "title,authors,year,abstract,citationCount,journal,venue,url,externalIds";

pub struct SemanticScholarAdapter {
    client: Client,
}

impl SemanticScholarAdapter {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self { client: Client::new()? })
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn id(&self) -> SourceId {
        SourceId::SemanticScholar
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        let params = [
            ("query", query.to_string()),
            ("limit", limit.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ];

        let resp = self
            .client
            .get(SEARCH_URL)?
            .query(&params)
            .send()
            .await
            .map_err(|e| unavailable(SourceId::SemanticScholar, e))?;

        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("Semantic Scholar rejected the request with 429");
            return Err(SearchError::RateLimitExceeded {
                source_id: SourceId::SemanticScholar,
            });
        }

        let body: serde_json::Value = resp
            .error_for_status()
            .map_err(|e| unavailable(SourceId::SemanticScholar, e))?
            .json()
            .await
            .map_err(|e| unavailable(SourceId::SemanticScholar, e))?;

        let papers = parse_search_response(&body);
        debug!(count = papers.len(), "Semantic Scholar search returned papers");
        Ok(papers.into_iter().filter(|p| filters.matches(p)).collect())
    }
}

/// Parse a paper-search response. Records without a title are skipped.
fn parse_search_response(resp: &serde_json::Value) -> Vec<Paper> {
    let mut papers = Vec::new();

    for record in resp["data"].as_array().unwrap_or(&vec![]) {
        let title = record["title"].as_str().unwrap_or("").trim().to_string();
        if title.is_empty() {
            warn!("skipping Semantic Scholar record with no title");
            continue;
        }

        let authors: Vec<Author> = record["authors"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|a| a["name"].as_str())
            .map(Author::named)
            .collect();

        // Prefer the structured journal name over the venue string
        let venue = record["journal"]["name"]
            .as_str()
            .or_else(|| record["venue"].as_str().filter(|v| !v.is_empty()))
            .map(String::from);

        let external = &record["externalIds"];

        papers.push(Paper {
            title,
            authors,
            year: record["year"].as_i64().map(|y| y as i32),
            abstract_text: record["abstract"].as_str().map(String::from),
            citation_count: record["citationCount"].as_u64().map(|c| c as u32),
            venue,
            doi: external["DOI"].as_str().map(String::from),
            pmid: external["PubMed"].as_str().map(String::from),
            arxiv_id: external["ArXiv"].as_str().map(String::from),
            url: record["url"].as_str().map(String::from),
            source: SourceId::SemanticScholar,
            impact_score: 0.0,
        });
    }

    papers
}
