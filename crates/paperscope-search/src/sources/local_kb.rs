//! Local knowledge base adapter.
//!
//! Searches a JSON master index of previously collected papers before
//! any external corpus is touched. A missing or unreadable index means
//! an empty result, never an error, so an unconfigured installation
//! degrades silently to remote-only search.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use paperscope_common::{Author, Paper, SearchError, SourceId};

use super::{SearchFilters, SourceAdapter};

/// Query terms shorter than this are ignored during scoring.
const MIN_TERM_LEN: usize = 3;

/// Per-match weights: a title hit counts more than an abstract hit.
const TITLE_WEIGHT: u32 = 5;
const KEYWORD_WEIGHT: u32 = 3;
const ABSTRACT_WEIGHT: u32 = 1;

/// One entry of the on-disk master index.
#[derive(Debug, Deserialize)]
struct IndexEntry {
    title: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    citation_count: Option<u32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MasterIndex {
    #[serde(default)]
    papers: Vec<IndexEntry>,
}

pub struct LocalKbAdapter {
    index_path: PathBuf,
}

impl LocalKbAdapter {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
        }
    }

    async fn load_index(&self) -> Option<MasterIndex> {
        let bytes = match tokio::fs::read(&self.index_path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(path = %self.index_path.display(), "no local index, skipping");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(index) => Some(index),
            Err(e) => {
                warn!(path = %self.index_path.display(), "unreadable local index: {e}");
                None
            }
        }
    }
}

fn score_entry(entry: &IndexEntry, terms: &[String]) -> u32 {
    let title = entry.title.to_lowercase();
    let abstract_text = entry
        .abstract_text
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let keywords: Vec<String> = entry.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut score = 0;
    for term in terms {
        if title.contains(term) {
            score += TITLE_WEIGHT;
        }
        if keywords.iter().any(|k| k.contains(term)) {
            score += KEYWORD_WEIGHT;
        }
        if abstract_text.contains(term) {
            score += ABSTRACT_WEIGHT;
        }
    }
    score
}

#[async_trait]
impl SourceAdapter for LocalKbAdapter {
    fn id(&self) -> SourceId {
        SourceId::LocalKb
    }

    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        let Some(index) = self.load_index().await else {
            return Ok(vec![]);
        };

        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() >= MIN_TERM_LEN)
            .map(String::from)
            .collect();
        if terms.is_empty() {
            return Ok(vec![]);
        }

        let mut scored: Vec<(u32, Paper)> = index
            .papers
            .into_iter()
            .filter_map(|entry| {
                let score = score_entry(&entry, &terms);
                if score == 0 {
                    return None;
                }
                Some((
                    score,
                    Paper {
                        title: entry.title,
                        authors: entry.authors.iter().map(|a| Author::named(a)).collect(),
                        year: entry.year,
                        abstract_text: entry.abstract_text,
                        citation_count: entry.citation_count,
                        venue: entry.venue,
                        doi: entry.doi,
                        pmid: None,
                        arxiv_id: None,
                        url: entry.url,
                        source: SourceId::LocalKb,
                        impact_score: 0.0,
                    },
                ))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.title.cmp(&b.1.title)));

        debug!(count = scored.len(), "local index matches");
        Ok(scored
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| filters.matches(p))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_index(dir: &tempfile::TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("master_index.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(json.as_bytes()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_index_yields_empty_not_error() {
        let adapter = LocalKbAdapter::new("/nonexistent/master_index.json");
        let papers = adapter
            .search("epilepsy", 10, &SearchFilters::default())
            .await
            .unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_index_yields_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(&dir, "{not json");
        let adapter = LocalKbAdapter::new(path);
        let papers = adapter
            .search("epilepsy", 10, &SearchFilters::default())
            .await
            .unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_title_matches_rank_above_abstract_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(
            &dir,
            r#"{"papers": [
                {"title": "A modeling study", "abstract": "We discuss epilepsy.", "year": 2020},
                {"title": "Epilepsy networks", "year": 2021, "keywords": ["epilepsy"]},
                {"title": "Unrelated botany", "year": 2019}
            ]}"#,
        );
        let adapter = LocalKbAdapter::new(path);
        let papers = adapter
            .search("epilepsy", 10, &SearchFilters::default())
            .await
            .unwrap();

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Epilepsy networks");
        assert_eq!(papers[0].source, SourceId::LocalKb);
    }

    #[tokio::test]
    async fn test_short_terms_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_index(
            &dir,
            r#"{"papers": [{"title": "An of to study"}]}"#,
        );
        let adapter = LocalKbAdapter::new(path);
        let papers = adapter
            .search("an of to", 10, &SearchFilters::default())
            .await
            .unwrap();
        assert!(papers.is_empty());
    }
}
