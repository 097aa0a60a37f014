//! bioRxiv adapter.
//!
//! The bioRxiv API has no free-text search; the details endpoint
//! returns preprints posted inside a date interval. We pull a rolling
//! window of recent postings and filter client-side by query terms
//! against title and abstract. Everything here is an open-access
//! preprint, so citation counts start at zero.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, instrument, warn};

use paperscope_common::sandbox::SandboxClient as Client;
use paperscope_common::{Author, Paper, SearchError, SourceId};

use super::{unavailable, SearchFilters, SourceAdapter};

const DETAILS_URL: &str = "https://api.biorxiv.org/details/biorxiv";

/// How far back the rolling posting window reaches.
const WINDOW_DAYS: i64 = 180;

pub struct BioRxivAdapter {
    client: Client,
}

impl BioRxivAdapter {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self { client: Client::new()? })
    }
}

#[async_trait]
impl SourceAdapter for BioRxivAdapter {
    fn id(&self) -> SourceId {
        SourceId::BioRxiv
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(WINDOW_DAYS);
        let url = format!(
            "{DETAILS_URL}/{}/{}/0/json",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );

        let resp: serde_json::Value = self
            .client
            .get(&url)?
            .send()
            .await
            .map_err(|e| unavailable(SourceId::BioRxiv, e))?
            .error_for_status()
            .map_err(|e| unavailable(SourceId::BioRxiv, e))?
            .json()
            .await
            .map_err(|e| unavailable(SourceId::BioRxiv, e))?;

        let papers = parse_collection(&resp, query);
        debug!(count = papers.len(), "bioRxiv window yielded matching preprints");
        Ok(papers
            .into_iter()
            .filter(|p| filters.matches(p))
            .take(limit)
            .collect())
    }
}

/// Parse the details response and keep records where any query term
/// occurs in the title or abstract.
fn parse_collection(resp: &serde_json::Value, query: &str) -> Vec<Paper> {
    let status_ok = resp["messages"]
        .as_array()
        .and_then(|m| m.first())
        .and_then(|m| m["status"].as_str())
        == Some("ok");
    if !status_ok {
        warn!("bioRxiv details response carried no ok status");
        return vec![];
    }

    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect();

    let mut papers = Vec::new();
    for record in resp["collection"].as_array().unwrap_or(&vec![]) {
        let title = record["title"].as_str().unwrap_or("").trim().to_string();
        if title.is_empty() {
            continue;
        }

        let abstract_text = record["abstract"].as_str().unwrap_or("");
        let haystack = format!("{} {}", title.to_lowercase(), abstract_text.to_lowercase());
        if !terms.iter().any(|t| haystack.contains(t)) {
            continue;
        }

        // Authors arrive as "Last, F.; Last, F." in one string
        let authors: Vec<Author> = record["authors"]
            .as_str()
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(Author::named)
            .collect();

        let year = record["date"]
            .as_str()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse::<i32>().ok());

        let doi = record["doi"].as_str().map(String::from);
        let version = record["version"].as_str().unwrap_or("1");
        let url = doi
            .as_deref()
            .map(|d| format!("https://www.biorxiv.org/content/{d}v{version}"));

        papers.push(Paper {
            title,
            authors,
            year,
            abstract_text: Some(abstract_text.to_string()).filter(|a| !a.is_empty()),
            citation_count: Some(0),
            venue: Some("bioRxiv preprint".to_string()),
            doi,
            pmid: None,
            arxiv_id: None,
            url,
            source: SourceId::BioRxiv,
            impact_score: 0.0,
        });
    }

    papers
}
