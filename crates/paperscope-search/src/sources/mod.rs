//! Corpus adapters.
//!
//! One implementation per external corpus, each normalizing its wire
//! format into `Paper` behind the same capability interface. All
//! remote adapters go through the allowlist-capped client; the
//! orchestrator bounds each call with the source's configured deadline.

pub mod arxiv;
pub mod biorxiv;
pub mod local_kb;
pub mod nih_reporter;
pub mod pubmed;
pub mod semanticscholar;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use paperscope_common::{Paper, SearchError, SourceId};

/// Request-level result filters, applied by each adapter to its
/// normalized records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
    pub author: Option<String>,
}

impl SearchFilters {
    /// Stable textual form used in cache key derivation.
    pub fn fingerprint(&self) -> String {
        format!(
            "y{}-{};a{}",
            self.year_min.map(|y| y.to_string()).unwrap_or_default(),
            self.year_max.map(|y| y.to_string()).unwrap_or_default(),
            self.author.as_deref().unwrap_or_default().to_lowercase(),
        )
    }

    pub fn matches(&self, paper: &Paper) -> bool {
        if self.year_min.is_some() || self.year_max.is_some() {
            let Some(year) = paper.year else { return false };
            if self.year_min.is_some_and(|min| year < min) {
                return false;
            }
            if self.year_max.is_some_and(|max| year > max) {
                return false;
            }
        }

        if let Some(author) = &self.author {
            let needle = author.to_lowercase();
            if !paper
                .authors
                .iter()
                .any(|a| a.name.to_lowercase().contains(&needle))
            {
                return false;
            }
        }

        true
    }
}

/// Common interface for all corpus adapters.
///
/// Transport failures surface as `SourceUnavailable` (recoverable);
/// malformed individual records are skipped, never fatal. Callers must
/// pass through `RateLimiter::acquire` before invoking `search`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> SourceId;

    async fn search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError>;
}

/// Map a transport error into the recoverable per-source signal.
pub(crate) fn unavailable(source: SourceId, err: impl std::fmt::Display) -> SearchError {
    SearchError::SourceUnavailable {
        source_id: source,
        reason: err.to_string(),
    }
}
