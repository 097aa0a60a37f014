//! Core data models shared across the search pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One external corpus (or the local knowledge base). Fixed,
/// process-wide enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    PubMed,
    Arxiv,
    BioRxiv,
    SemanticScholar,
    NihReporter,
    LocalKb,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::PubMed          => "pubmed",
            SourceId::Arxiv           => "arxiv",
            SourceId::BioRxiv         => "biorxiv",
            SourceId::SemanticScholar => "semanticscholar",
            SourceId::NihReporter     => "nih_reporter",
            SourceId::LocalKb         => "local_kb",
        }
    }

    pub fn all() -> &'static [SourceId] {
        &[
            SourceId::PubMed,
            SourceId::Arxiv,
            SourceId::BioRxiv,
            SourceId::SemanticScholar,
            SourceId::NihReporter,
            SourceId::LocalKb,
        ]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pubmed"          => Ok(SourceId::PubMed),
            "arxiv"           => Ok(SourceId::Arxiv),
            "biorxiv"         => Ok(SourceId::BioRxiv),
            "semanticscholar" => Ok(SourceId::SemanticScholar),
            "nih_reporter"    => Ok(SourceId::NihReporter),
            "local_kb"        => Ok(SourceId::LocalKb),
            other             => Err(format!("unknown source: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub affiliation: Option<String>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), affiliation: None }
    }
}

/// A paper as normalized by a source adapter. Immutable value object
/// after construction; serializable for the cache persistence boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub abstract_text: Option<String>,
    pub citation_count: Option<u32>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub arxiv_id: Option<String>,
    pub url: Option<String>,
    pub source: SourceId,
    /// Derived by the ranker; not an input.
    #[serde(default)]
    pub impact_score: f64,
}

impl Paper {
    /// Count of the optional fields dedup cares about when picking the
    /// richer of two duplicate records.
    pub fn populated_fields(&self) -> usize {
        [
            self.citation_count.is_some(),
            self.abstract_text.is_some(),
            self.venue.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }
}
