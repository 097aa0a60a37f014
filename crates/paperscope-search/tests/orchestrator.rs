//! End-to-end pipeline tests over mock corpus adapters.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use paperscope_common::{Author, Paper, SearchError, SourceId};
use paperscope_config::{CacheConfig, Config, SourceRateConfig};
use paperscope_search::{SearchFilters, SearchOrchestrator, SearchRequest, SourceAdapter};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("paperscope_search=debug")
        .with_test_writer()
        .try_init();
}

fn paper(title: &str, source: SourceId, citations: u32) -> Paper {
    Paper {
        title: title.to_string(),
        authors: vec![Author::named("Smith J")],
        year: Some(2025),
        abstract_text: None,
        citation_count: Some(citations),
        venue: None,
        doi: None,
        pmid: None,
        arxiv_id: None,
        url: None,
        source,
        impact_score: 0.0,
    }
}

/// Canned adapter: counts calls and replays a fixed outcome.
struct MockAdapter {
    id: SourceId,
    calls: Arc<AtomicUsize>,
    outcome: Result<Vec<Paper>, ()>,
}

impl MockAdapter {
    fn returning(id: SourceId, papers: Vec<Paper>) -> (Arc<dyn SourceAdapter>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = Arc::new(Self {
            id,
            calls: Arc::clone(&calls),
            outcome: Ok(papers),
        });
        (adapter, calls)
    }

    fn failing(id: SourceId) -> (Arc<dyn SourceAdapter>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = Arc::new(Self {
            id,
            calls: Arc::clone(&calls),
            outcome: Err(()),
        });
        (adapter, calls)
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(papers) => Ok(papers.clone()),
            Err(()) => Err(SearchError::SourceUnavailable {
                source_id: self.id,
                reason: "connection refused".to_string(),
            }),
        }
    }
}

/// Adapter that never answers; stands in for an unresponsive corpus.
struct HangingAdapter(SourceId);

#[async_trait]
impl SourceAdapter for HangingAdapter {
    fn id(&self) -> SourceId {
        self.0
    }

    async fn search(
        &self,
        _query: &str,
        _limit: usize,
        _filters: &SearchFilters,
    ) -> Result<Vec<Paper>, SearchError> {
        std::future::pending().await
    }
}

fn test_config(dir: &TempDir) -> Config {
    init_tracing();
    let mut config = Config {
        cache: CacheConfig {
            directory: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        },
        ..Default::default()
    };
    // No pacing delays in tests
    config.rate_limit.defaults = SourceRateConfig {
        min_interval_ms: 0,
        backoff_base_ms: 1,
        backoff_cap_ms: 2,
        ..Default::default()
    };
    config
}

#[tokio::test]
async fn aggregates_ranks_and_truncates_across_sources() {
    let dir = TempDir::new().unwrap();
    let (pubmed, _) = MockAdapter::returning(
        SourceId::PubMed,
        vec![
            paper("Low impact study", SourceId::PubMed, 2),
            paper("High impact study", SourceId::PubMed, 500),
        ],
    );
    let (s2, _) = MockAdapter::returning(
        SourceId::SemanticScholar,
        vec![paper("Middle impact study", SourceId::SemanticScholar, 40)],
    );

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed, s2]).unwrap();
    let results = orch
        .search(SearchRequest {
            query: "seizure prediction".into(),
            limit: Some(2),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "High impact study");
    assert_eq!(results[1].title, "Middle impact study");
    assert!(results[0].impact_score > results[1].impact_score);
}

#[tokio::test]
async fn all_sources_failing_is_aggregation_empty() {
    let dir = TempDir::new().unwrap();
    let (pubmed, pubmed_calls) = MockAdapter::failing(SourceId::PubMed);
    let (s2, s2_calls) = MockAdapter::failing(SourceId::SemanticScholar);

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed, s2]).unwrap();
    let err = orch
        .search(SearchRequest::new("seizure prediction"))
        .await
        .unwrap_err();

    assert!(matches!(err, SearchError::AggregationEmpty));
    assert_eq!(pubmed_calls.load(Ordering::SeqCst), 1);
    assert_eq!(s2_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn partial_failure_still_yields_results() {
    let dir = TempDir::new().unwrap();
    let (pubmed, _) = MockAdapter::failing(SourceId::PubMed);
    let (s2, _) = MockAdapter::returning(
        SourceId::SemanticScholar,
        vec![paper("Survivor", SourceId::SemanticScholar, 10)],
    );

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed, s2]).unwrap();
    let results = orch
        .search(SearchRequest::new("seizure prediction"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Survivor");
}

#[tokio::test]
async fn slow_source_times_out_and_is_dropped() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    // Zero deadline for the stuck source so the test never waits
    config.rate_limit.pubmed = Some(SourceRateConfig {
        min_interval_ms: 0,
        timeout_secs: 0,
        ..Default::default()
    });

    let (s2, _) = MockAdapter::returning(
        SourceId::SemanticScholar,
        vec![paper("Fast source", SourceId::SemanticScholar, 7)],
    );

    let orch = SearchOrchestrator::with_adapters(
        config,
        vec![Arc::new(HangingAdapter(SourceId::PubMed)), s2],
    )
    .unwrap();
    let results = orch
        .search(SearchRequest::new("seizure prediction"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Fast source");
}

#[tokio::test]
async fn warm_cache_serves_without_touching_adapters() {
    let dir = TempDir::new().unwrap();
    let (pubmed, pubmed_calls) = MockAdapter::returning(
        SourceId::PubMed,
        vec![paper("Cached paper", SourceId::PubMed, 10)],
    );
    let (s2, s2_calls) = MockAdapter::returning(
        SourceId::SemanticScholar,
        vec![paper("Another paper", SourceId::SemanticScholar, 5)],
    );

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed, s2]).unwrap();
    let request = SearchRequest::new("seizure prediction");

    let first = orch.search(request.clone()).await.unwrap();
    assert_eq!(pubmed_calls.load(Ordering::SeqCst), 1);
    assert_eq!(s2_calls.load(Ordering::SeqCst), 1);

    let second = orch.search(request).await.unwrap();
    assert_eq!(pubmed_calls.load(Ordering::SeqCst), 1, "cache hit must not refetch");
    assert_eq!(s2_calls.load(Ordering::SeqCst), 1);

    let titles = |papers: &[Paper]| -> Vec<String> {
        papers.iter().map(|p| p.title.clone()).collect()
    };
    assert_eq!(titles(&first), titles(&second));
}

#[tokio::test]
async fn duplicate_doi_across_sources_collapses_to_one() {
    let dir = TempDir::new().unwrap();

    let mut from_pubmed = paper("Shared study", SourceId::PubMed, 0);
    from_pubmed.doi = Some("10.1000/shared".into());
    let mut from_s2 = paper("Shared Study", SourceId::SemanticScholar, 120);
    from_s2.doi = Some("10.1000/SHARED".into());
    from_s2.abstract_text = Some("Merged abstract.".into());

    let (pubmed, _) = MockAdapter::returning(SourceId::PubMed, vec![from_pubmed]);
    let (s2, _) = MockAdapter::returning(SourceId::SemanticScholar, vec![from_s2]);

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed, s2]).unwrap();
    let results = orch
        .search(SearchRequest::new("seizure prediction"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].citation_count, Some(120));
    assert_eq!(results[0].abstract_text.as_deref(), Some("Merged abstract."));
}

#[tokio::test]
async fn explicit_source_override_restricts_fan_out() {
    let dir = TempDir::new().unwrap();
    let (pubmed, pubmed_calls) = MockAdapter::returning(
        SourceId::PubMed,
        vec![paper("PubMed only", SourceId::PubMed, 1)],
    );
    let (s2, s2_calls) = MockAdapter::returning(
        SourceId::SemanticScholar,
        vec![paper("Unwanted", SourceId::SemanticScholar, 99)],
    );

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed, s2]).unwrap();
    let results = orch
        .search(SearchRequest {
            query: "seizure prediction".into(),
            sources: Some(vec![SourceId::PubMed]),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "PubMed only");
    assert_eq!(pubmed_calls.load(Ordering::SeqCst), 1);
    assert_eq!(s2_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn filters_flow_through_to_cache_key() {
    let dir = TempDir::new().unwrap();
    let (pubmed, pubmed_calls) = MockAdapter::returning(
        SourceId::PubMed,
        vec![paper("Recent", SourceId::PubMed, 3)],
    );

    let orch = SearchOrchestrator::with_adapters(test_config(&dir), vec![pubmed]).unwrap();

    let plain = SearchRequest::new("seizure prediction");
    orch.search(plain.clone()).await.unwrap();
    assert_eq!(pubmed_calls.load(Ordering::SeqCst), 1);

    // Different filters must not be served from the plain entry
    let filtered = SearchRequest {
        filters: SearchFilters {
            year_min: Some(2024),
            ..Default::default()
        },
        ..plain
    };
    orch.search(filtered).await.unwrap();
    assert_eq!(pubmed_calls.load(Ordering::SeqCst), 2);
}
