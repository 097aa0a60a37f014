//! Configuration loading for Paperscope.
//! Reads paperscope.toml from the current directory or the path in the
//! PAPERSCOPE_CONFIG env var. Every field has a serde default so a
//! partial (or absent) file still yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use paperscope_common::error::SearchError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub local_kb: LocalKbConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_query_len")]
    pub max_query_len: usize,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_top_k_fields")]
    pub top_k_fields: usize,
    /// Used when field detection yields nothing and no override is given.
    #[serde(default = "default_sources")]
    pub default_sources: Vec<String>,
}

fn default_max_query_len() -> usize { 200 }
fn default_limit()         -> usize { 10 }
fn default_top_k_fields()  -> usize { 3 }

fn default_sources() -> Vec<String> {
    vec!["semanticscholar".to_string(), "pubmed".to_string()]
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_query_len: default_max_query_len(),
            default_limit: default_limit(),
            top_k_fields: default_top_k_fields(),
            default_sources: default_sources(),
        }
    }
}

/// Per-source rate limit parameters. The `[rate_limit]` table sets the
/// process-wide defaults; `[rate_limit.<source>]` tables override them
/// for a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRateConfig {
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Hard per-request deadline for this source.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_min_interval_ms() -> u64 { 2000 }
fn default_window_secs()     -> u64 { 60 }
fn default_max_per_window()  -> u32 { 20 }
fn default_backoff_base_ms() -> u64 { 1000 }
fn default_backoff_cap_ms()  -> u64 { 60_000 }
fn default_max_retries()     -> u32 { 3 }
fn default_timeout_secs()    -> u64 { 10 }

impl Default for SourceRateConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            window_secs: default_window_secs(),
            max_per_window: default_max_per_window(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimitConfig {
    #[serde(flatten)]
    pub defaults: SourceRateConfig,
    pub pubmed: Option<SourceRateConfig>,
    pub arxiv: Option<SourceRateConfig>,
    pub biorxiv: Option<SourceRateConfig>,
    pub semanticscholar: Option<SourceRateConfig>,
    pub nih_reporter: Option<SourceRateConfig>,
    pub local_kb: Option<SourceRateConfig>,
}

impl RateLimitConfig {
    /// Parameters for one source: its override table, or the defaults.
    pub fn for_source(&self, source: &str) -> SourceRateConfig {
        let override_cfg = match source {
            "pubmed"          => &self.pubmed,
            "arxiv"           => &self.arxiv,
            "biorxiv"         => &self.biorxiv,
            "semanticscholar" => &self.semanticscholar,
            "nih_reporter"    => &self.nih_reporter,
            "local_kb"        => &self.local_kb,
            _                 => &None,
        };
        override_cfg.clone().unwrap_or_else(|| self.defaults.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub directory: String,
    #[serde(default = "default_size_limit")]
    pub size_limit_bytes: u64,
    #[serde(default = "default_ttl_default")]
    pub ttl_default_hours: u64,
    #[serde(default = "default_ttl_extended")]
    pub ttl_extended_hours: u64,
    #[serde(default = "default_ttl_archival")]
    pub ttl_archival_hours: u64,
}

fn default_cache_dir()    -> String { "./cache".to_string() }
fn default_size_limit()   -> u64    { 100 * 1024 * 1024 }
fn default_ttl_default()  -> u64    { 24 }
fn default_ttl_extended() -> u64    { 168 }
fn default_ttl_archival() -> u64    { 720 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_dir(),
            size_limit_bytes: default_size_limit(),
            ttl_default_hours: default_ttl_default(),
            ttl_extended_hours: default_ttl_extended(),
            ttl_archival_hours: default_ttl_archival(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalKbConfig {
    /// Path to the master index JSON. Absent means the local knowledge
    /// base is not configured and contributes no results.
    pub index_path: Option<String>,
}

impl Config {
    /// Load configuration from paperscope.toml.
    /// Checks PAPERSCOPE_CONFIG env var first, then the current directory.
    pub fn load() -> Result<Self, SearchError> {
        let path = std::env::var("PAPERSCOPE_CONFIG")
            .unwrap_or_else(|_| "paperscope.toml".to_string());

        if !Path::new(&path).exists() {
            return Err(SearchError::Config(format!("Config file not found: {path}")));
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| SearchError::Config(format!("Failed to read {path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, falling back to built-in defaults when no
    /// config file exists.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SearchError> {
        toml::from_str(content).map_err(|e| SearchError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.search.max_query_len, 200);
        assert_eq!(cfg.search.default_limit, 10);
        assert_eq!(cfg.rate_limit.defaults.min_interval_ms, 2000);
        assert_eq!(cfg.cache.ttl_default_hours, 24);
        assert_eq!(cfg.cache.ttl_extended_hours, 168);
        assert_eq!(cfg.cache.ttl_archival_hours, 720);
        assert!(cfg.local_kb.index_path.is_none());
    }

    #[test]
    fn test_per_source_rate_limit_override() {
        let cfg = Config::from_toml_str(
            r#"
            [rate_limit]
            min_interval_ms = 500

            [rate_limit.semanticscholar]
            min_interval_ms = 3000
            max_per_window = 10
            timeout_secs = 30
            "#,
        )
        .unwrap();

        let s2 = cfg.rate_limit.for_source("semanticscholar");
        assert_eq!(s2.min_interval_ms, 3000);
        assert_eq!(s2.max_per_window, 10);
        assert_eq!(s2.timeout_secs, 30);

        // Unlisted source falls back to the [rate_limit] defaults
        let pubmed = cfg.rate_limit.for_source("pubmed");
        assert_eq!(pubmed.min_interval_ms, 500);
        assert_eq!(pubmed.max_per_window, 20);
        assert_eq!(pubmed.timeout_secs, 10);
    }

    #[test]
    fn test_partial_cache_section() {
        let cfg = Config::from_toml_str(
            r#"
            [cache]
            directory = "/tmp/paperscope-cache"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.cache.directory, "/tmp/paperscope-cache");
        assert_eq!(cfg.cache.size_limit_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = Config::from_toml_str("[search\nmax_query_len = 50").unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }
}
