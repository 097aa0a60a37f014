//! Request pipeline.
//!
//! One entry point, `SearchOrchestrator::search`, runs the whole
//! aggregation: sanitize, field detection, source selection, cache
//! lookup, concurrent rate-limited fan-out, dedup, ranking, cache
//! store. Per-source failures degrade to empty contributions; only
//! query validation aborts before any network activity.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{spawn_blocking, JoinSet};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, instrument, warn};

use paperscope_common::{Paper, SearchError, SourceId};
use paperscope_config::Config;

use crate::cache::{derive_key, ResultCache};
use crate::dedup::dedupe;
use crate::fields::FieldDetector;
use crate::rank::RelevanceRanker;
use crate::ratelimit::RateLimiter;
use crate::sanitize::sanitize;
use crate::sources::{
    arxiv::ArxivAdapter, biorxiv::BioRxivAdapter, local_kb::LocalKbAdapter,
    nih_reporter::NihReporterAdapter, pubmed::PubMedAdapter,
    semanticscholar::SemanticScholarAdapter, SearchFilters, SourceAdapter,
};
use crate::ttl::ttl_class_for;

/// One aggregation request. Sources, limit, and filters are optional;
/// unset sources let field detection pick.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    /// Explicit source override; bypasses field-based routing.
    pub sources: Option<Vec<SourceId>>,
    pub filters: SearchFilters,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

pub struct SearchOrchestrator {
    config: Config,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResultCache>,
    detector: FieldDetector,
    ranker: RelevanceRanker,
    adapters: HashMap<SourceId, Arc<dyn SourceAdapter>>,
}

impl SearchOrchestrator {
    /// Full production wiring: every remote adapter, plus the local
    /// knowledge base when an index path is configured. The NCBI API
    /// key is picked up from the environment when present.
    pub fn new(config: Config) -> Result<Self, SearchError> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(PubMedAdapter::new(std::env::var("NCBI_API_KEY").ok())?),
            Arc::new(ArxivAdapter::new()?),
            Arc::new(BioRxivAdapter::new()?),
            Arc::new(SemanticScholarAdapter::new()?),
            Arc::new(NihReporterAdapter::new()?),
        ];
        if let Some(path) = &config.local_kb.index_path {
            adapters.push(Arc::new(LocalKbAdapter::new(path)));
        }
        Self::with_adapters(config, adapters)
    }

    /// Wire an explicit adapter set. Used by tests and by embedders
    /// that bring their own corpora.
    pub fn with_adapters(
        config: Config,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Result<Self, SearchError> {
        let default_sources: Vec<SourceId> = config
            .search
            .default_sources
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        let detector = FieldDetector::new(
            FieldDetector::default().profiles().to_vec(),
            default_sources,
        );

        Ok(Self {
            limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            cache: Arc::new(ResultCache::new(&config.cache)?),
            detector,
            ranker: RelevanceRanker::default(),
            adapters: adapters.into_iter().map(|a| (a.id(), a)).collect(),
            config,
        })
    }

    /// Explicit override wins, else the field-routed recommendation,
    /// and either way only sources with a registered adapter survive.
    fn select_sources(
        &self,
        override_sources: Option<&[SourceId]>,
        recommended: &[SourceId],
    ) -> Vec<SourceId> {
        override_sources
            .unwrap_or(recommended)
            .iter()
            .copied()
            .filter(|s| self.adapters.contains_key(s))
            .collect()
    }

    #[instrument(skip(self, request), fields(query = %request.query))]
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<Paper>, SearchError> {
        let query = sanitize(&request.query, self.config.search.max_query_len)?;
        let limit = request.limit.unwrap_or(self.config.search.default_limit);

        let fields = self.detector.detect(&query);
        let recommended = self
            .detector
            .recommend_sources(&fields, self.config.search.top_k_fields);
        let selected = self.select_sources(request.sources.as_deref(), &recommended);
        if selected.is_empty() {
            return Err(SearchError::AggregationEmpty);
        }
        debug!(?fields, ?selected, "routed query");

        let key = derive_key(&query, &selected, limit, &request.filters);
        // Cache I/O hits the disk; keep it off the async workers
        let lookup = {
            let cache = Arc::clone(&self.cache);
            let key = key.clone();
            spawn_blocking(move || cache.get(&key)).await
        };
        match lookup {
            Ok(Some(papers)) => {
                info!(count = papers.len(), "served from cache");
                return Ok(papers);
            }
            Ok(None) => {}
            Err(e) => warn!("cache lookup task failed: {e}"),
        }

        let mut tasks = JoinSet::new();
        for source in &selected {
            let adapter = Arc::clone(&self.adapters[source]);
            let limiter = Arc::clone(&self.limiter);
            let query = query.clone();
            let filters = request.filters.clone();
            let deadline =
                Duration::from_secs(self.config.rate_limit.for_source(source.as_str()).timeout_secs);
            tasks.spawn(async move {
                let id = adapter.id();
                (id, query_source(limiter, adapter, &query, limit, &filters, deadline).await)
            });
        }

        let mut collected: Vec<Paper> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((source, Ok(papers))) => {
                    debug!(%source, count = papers.len(), "source contributed");
                    collected.extend(papers);
                }
                Ok((source, Err(e))) => {
                    warn!(%source, "source dropped from aggregation: {e}");
                }
                Err(e) => {
                    warn!("source task failed to settle: {e}");
                }
            }
        }

        let merged = dedupe(collected, &selected);
        let mut ranked = self.ranker.rank(merged);
        ranked.truncate(limit);

        if ranked.is_empty() {
            return Err(SearchError::AggregationEmpty);
        }

        // A cache write failure degrades the cache, not the request
        let store = {
            let cache = Arc::clone(&self.cache);
            let payload = ranked.clone();
            let class = ttl_class_for(&fields);
            spawn_blocking(move || cache.put(&key, &payload, class)).await
        };
        match store {
            Ok(Err(e)) => warn!("cache store failed: {e}"),
            Err(e) => warn!("cache store task failed: {e}"),
            Ok(Ok(())) => {}
        }

        info!(count = ranked.len(), "aggregation complete");
        Ok(ranked)
    }
}

/// One source's slice of the fan-out: wait for a local grant, call the
/// adapter under the source's configured deadline, and retry under
/// backoff when the remote pushes back with a rate-limit rejection.
async fn query_source(
    limiter: Arc<RateLimiter>,
    adapter: Arc<dyn SourceAdapter>,
    query: &str,
    limit: usize,
    filters: &SearchFilters,
    deadline: Duration,
) -> Result<Vec<Paper>, SearchError> {
    let id = adapter.id();
    loop {
        limiter.acquire(id).await;

        let outcome = timeout(deadline, adapter.search(query, limit, filters)).await;
        match outcome {
            Err(_) => {
                return Err(SearchError::SourceUnavailable {
                    source_id: id,
                    reason: format!("timed out after {}s", deadline.as_secs()),
                })
            }
            Ok(Ok(papers)) => {
                limiter.reset(id).await;
                return Ok(papers);
            }
            Ok(Err(SearchError::RateLimitExceeded { .. })) => {
                // Remote 429: back off and retry until the attempt cap
                let delay = limiter.backoff(id).await?;
                sleep(delay).await;
            }
            Ok(Err(e)) => return Err(e),
        }
    }
}
