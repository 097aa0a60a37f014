use thiserror::Error;

use crate::models::SourceId;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad input. Fatal to the request, reported before any network call.
    #[error("Invalid query: {0}")]
    Validation(String),

    /// Backoff retries for a source exhausted. The source contributes
    /// nothing to this request; the request itself continues.
    //
    // Field is source_id, not source: thiserror reserves `source` for
    // error-cause chaining.
    #[error("Rate limit exceeded for {source_id}")]
    RateLimitExceeded { source_id: SourceId },

    /// Transport failure (network error, non-success status, timeout).
    /// Recoverable: the source contributes nothing to this request.
    #[error("Source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },

    /// Unreadable cache entry. Treated as a miss by the cache itself;
    /// surfaced only in logs.
    #[error("Cache entry corrupt: {0}")]
    CacheCorruption(String),

    /// Every selected source returned nothing. Distinct from a normal
    /// result so the caller can refuse rather than hallucinate.
    #[error("No source returned any results")]
    AggregationEmpty,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// Recoverable failures degrade to an empty per-source contribution
    /// instead of aborting the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SearchError::RateLimitExceeded { .. }
                | SearchError::SourceUnavailable { .. }
                | SearchError::CacheCorruption(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
