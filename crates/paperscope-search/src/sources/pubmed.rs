//! PubMed E-utilities adapter.
//!
//! Endpoints used:
//!   esearch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   esummary: https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi
//!
//! esearch resolves the query to a PMID list, esummary fetches the
//! article summaries in one batch. An optional API key raises NCBI's
//! server-side quota.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use paperscope_common::sandbox::SandboxClient as Client;
use paperscope_common::{Author, Paper, SearchError, SourceId};

use super::{unavailable, SearchFilters, SourceAdapter};

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const ESUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

pub struct PubMedAdapter {
    client: Client,
    api_key: Option<String>,
}

impl PubMedAdapter {
    pub fn new(api_key: Option<String>) -> Result<Self, SearchError> {
        Ok(Self {
            client: Client::new()?,
            api_key,
        })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("retmode", "json".to_string())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Search PubMed and return a list of PMIDs.
    #[instrument(skip(self))]
    async fn esearch(&self, query: &str, max: usize) -> Result<Vec<String>, SearchError> {
        let mut params = self.base_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("term", query.to_string()));
        params.push(("retmax", max.to_string()));

        let resp: serde_json::Value = self
            .client
            .get(ESEARCH_URL)?
            .query(&params)
            .send()
            .await
            .map_err(|e| unavailable(SourceId::PubMed, e))?
            .error_for_status()
            .map_err(|e| unavailable(SourceId::PubMed, e))?
            .json()
            .await
            .map_err(|e| unavailable(SourceId::PubMed, e))?;

        let ids = resp["esearchresult"]["idlist"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();

        debug!(?ids, "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch esummary records for a list of PMIDs.
    #[instrument(skip(self))]
    async fn esummary(&self, pmids: &[String]) -> Result<Vec<Paper>, SearchError> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }

        let mut params = self.base_params();
        params.push(("db", "pubmed".to_string()));
        params.push(("id", pmids.join(",")));

        let resp: serde_json::Value = self
            .client
            .get(ESUMMARY_URL)?
            .query(&params)
            .send()
            .await
            .map_err(|e| unavailable(SourceId::PubMed, e))?
            .error_for_status()
            .map_err(|e| unavailable(SourceId::PubMed, e))?
            .json()
            .await
            .map_err(|e| unavailable(SourceId::PubMed, e))?;

        Ok(parse_esummary(&resp))
    }
}

#[async_trait]
impl SourceAdapter for PubMedAdapter {
    fn id(&self) -> SourceId {
        SourceId::PubMed
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        let pmids = self.esearch(query, limit).await?;
        let papers = self.esummary(&pmids).await?;
        Ok(papers.into_iter().filter(|p| filters.matches(p)).collect())
    }
}

/// Parse an esummary JSON response. Records missing a title or uid are
/// skipped; the rest of the batch survives.
fn parse_esummary(resp: &serde_json::Value) -> Vec<Paper> {
    let result = &resp["result"];
    let uids = result["uids"].as_array().cloned().unwrap_or_default();

    let mut papers = Vec::new();
    for uid in uids.iter().filter_map(|u| u.as_str()) {
        let record = &result[uid];

        let title = record["title"].as_str().unwrap_or("").trim().to_string();
        if title.is_empty() {
            warn!(pmid = uid, "skipping esummary record with no title");
            continue;
        }

        let authors: Vec<Author> = record["authors"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|a| a["name"].as_str())
            .map(Author::named)
            .collect();

        // pubdate is like "2024 Jan 5"; the leading token is the year
        let year = record["pubdate"]
            .as_str()
            .and_then(|d| d.split_whitespace().next())
            .and_then(|y| y.parse::<i32>().ok());

        let doi = record["articleids"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .find(|id| id["idtype"].as_str() == Some("doi"))
            .and_then(|id| id["value"].as_str())
            .map(String::from);

        papers.push(Paper {
            title,
            authors,
            year,
            abstract_text: None, // esummary carries no abstract
            citation_count: None,
            venue: record["fulljournalname"].as_str().map(String::from),
            doi,
            pmid: Some(uid.to_string()),
            arxiv_id: None,
            url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{uid}/")),
            source: SourceId::PubMed,
            impact_score: 0.0,
        });
    }

    papers
}
