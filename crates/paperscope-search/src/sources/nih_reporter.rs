//! NIH RePORTER grant search adapter.
//!
//! Endpoint: POST https://api.reporter.nih.gov/v2/projects/search
//!
//! Grants are normalized into `Paper`: the project title becomes the
//! title, the contact PI the sole author, the abstract the abstract,
//! and the award start year the publication year. Venue is fixed to
//! "NIH RePORTER" so the ranker leaves grants at the base multiplier.

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use paperscope_common::sandbox::SandboxClient as Client;
use paperscope_common::{Author, Paper, SearchError, SourceId};

use super::{unavailable, SearchFilters, SourceAdapter};

const PROJECTS_URL: &str = "https://api.reporter.nih.gov/v2/projects/search";

pub struct NihReporterAdapter {
    client: Client,
}

impl NihReporterAdapter {
    pub fn new() -> Result<Self, SearchError> {
        Ok(Self { client: Client::new()? })
    }
}

#[async_trait]
impl SourceAdapter for NihReporterAdapter {
    fn id(&self) -> SourceId {
        SourceId::NihReporter
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        let payload = serde_json::json!({
            "criteria": {
                "advanced_text_search": {
                    "search_field": "terms",
                    "search_text": query
                }
            },
            "offset": 0,
            "limit": limit,
            "sort_field": "project_start_date",
            "sort_order": "desc",
            "include_fields": [
                "ProjectNum",
                "ProjectTitle",
                "ContactPiName",
                "OrgName",
                "ProjectStartDate",
                "AbstractText",
                "AwardAmount",
                "FiscalYear"
            ]
        });

        let resp: serde_json::Value = self
            .client
            .post(PROJECTS_URL)?
            .json(&payload)
            .send()
            .await
            .map_err(|e| unavailable(SourceId::NihReporter, e))?
            .error_for_status()
            .map_err(|e| unavailable(SourceId::NihReporter, e))?
            .json()
            .await
            .map_err(|e| unavailable(SourceId::NihReporter, e))?;

        let papers = parse_projects(&resp);
        debug!(count = papers.len(), "NIH RePORTER returned projects");
        Ok(papers.into_iter().filter(|p| filters.matches(p)).collect())
    }
}

/// Normalize project records into papers. Projects without a title are
/// skipped.
fn parse_projects(resp: &serde_json::Value) -> Vec<Paper> {
    let mut papers = Vec::new();

    for project in resp["results"].as_array().unwrap_or(&vec![]) {
        let title = project["project_title"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();
        if title.is_empty() {
            warn!("skipping RePORTER project with no title");
            continue;
        }

        let authors = project["contact_pi_name"]
            .as_str()
            .map(|pi| vec![Author::named(pi.trim())])
            .unwrap_or_default();

        // project_start_date is ISO-8601; the leading 4 chars are the year
        let year = project["project_start_date"]
            .as_str()
            .and_then(|d| d.get(0..4))
            .and_then(|y| y.parse::<i32>().ok())
            .or_else(|| project["fiscal_year"].as_i64().map(|y| y as i32));

        let url = project["project_num"].as_str().map(|num| {
            format!(
                "https://reporter.nih.gov/project-details/{}",
                num.replace(' ', "")
            )
        });

        papers.push(Paper {
            title,
            authors,
            year,
            abstract_text: project["abstract_text"].as_str().map(String::from),
            citation_count: None,
            venue: Some("NIH RePORTER".to_string()),
            doi: None,
            pmid: None,
            arxiv_id: None,
            url,
            source: SourceId::NihReporter,
            impact_score: 0.0,
        });
    }

    papers
}
