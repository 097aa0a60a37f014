//! Disk-backed result cache.
//!
//! File-per-entry store under a configurable directory. Keys are
//! SHA-256 over the normalized request, so the raw query text never
//! appears on disk. Expiry is checked lazily on read; corrupt or
//! unreadable entries are misses, never errors. Writes go through a
//! temp file + rename, so concurrent same-key puts resolve to
//! last-writer-wins and readers never observe a partial entry.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, warn};

use paperscope_common::{Paper, SearchError, SourceId};
use paperscope_config::CacheConfig;

use crate::sources::SearchFilters;
use crate::ttl::TtlClass;

/// Derived cache key; hex form names the entry file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

/// Deterministic, collision-resistant key over the normalized request.
/// The source set is sorted so selection order does not split the cache.
pub fn derive_key(
    query: &str,
    sources: &[SourceId],
    limit: usize,
    filters: &SearchFilters,
) -> CacheKey {
    let mut names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    names.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(query.to_lowercase().trim().as_bytes());
    hasher.update(b":");
    hasher.update(names.join(",").as_bytes());
    hasher.update(b":");
    hasher.update(limit.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(filters.fingerprint().as_bytes());

    CacheKey(format!("{:x}", hasher.finalize()))
}

/// On-disk entry format. Stable across process restarts so a
/// cold-started process can reuse a warm cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub papers: Vec<Paper>,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        age.num_seconds() < 0 || age.num_seconds() as u64 > self.ttl_secs
    }
}

pub struct ResultCache {
    dir: PathBuf,
    size_limit: u64,
    config: CacheConfig,
    /// Last-access times for LRU eviction; file mtime is the
    /// cold-start fallback.
    access: Mutex<HashMap<String, SystemTime>>,
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Result<Self, SearchError> {
        let dir = PathBuf::from(&config.directory);
        fs::create_dir_all(&dir)
            .map_err(|e| SearchError::Config(format!("cache dir {}: {e}", dir.display())))?;

        Ok(Self {
            dir,
            size_limit: config.size_limit_bytes,
            config: config.clone(),
            access: Mutex::new(HashMap::new()),
        })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_hex()))
    }

    /// Returns an owned copy of the cached payload, or a miss. Expired
    /// and corrupt entries are removed on the way out.
    pub fn get(&self, key: &CacheKey) -> Option<Vec<Paper>> {
        let path = self.entry_path(key);
        let bytes = fs::read(&path).ok()?;

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    key = key.as_hex(),
                    "{}",
                    SearchError::CacheCorruption(e.to_string())
                );
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if entry.is_expired(Utc::now()) {
            debug!(key = key.as_hex(), "cache entry expired");
            let _ = fs::remove_file(&path);
            return None;
        }

        self.touch(key);
        debug!(key = key.as_hex(), count = entry.papers.len(), "cache hit");
        Some(entry.papers)
    }

    /// Store the ranked payload under the derived key. Same-key races
    /// resolve to the last writer; distinct keys never contend beyond
    /// the brief access-index lock.
    pub fn put(
        &self,
        key: &CacheKey,
        papers: &[Paper],
        class: TtlClass,
    ) -> Result<(), SearchError> {
        let entry = CacheEntry {
            papers: papers.to_vec(),
            fetched_at: Utc::now(),
            ttl_secs: class.duration(&self.config).as_secs(),
        };
        let bytes = serde_json::to_vec(&entry)?;

        let tmp = self.dir.join(format!(
            ".{}.tmp{}",
            key.as_hex(),
            rand::thread_rng().gen::<u64>()
        ));
        fs::write(&tmp, &bytes)
            .map_err(|e| SearchError::Config(format!("cache write: {e}")))?;
        fs::rename(&tmp, self.entry_path(key))
            .map_err(|e| SearchError::Config(format!("cache rename: {e}")))?;

        self.touch(key);
        debug!(key = key.as_hex(), count = papers.len(), "cached results");

        self.sweep_if_over_limit();
        Ok(())
    }

    fn touch(&self, key: &CacheKey) {
        if let Ok(mut access) = self.access.lock() {
            access.insert(key.as_hex().to_string(), SystemTime::now());
        }
    }

    /// Evict least-recently-used entries once total size exceeds the
    /// configured bound.
    fn sweep_if_over_limit(&self) {
        let mut entries: Vec<(PathBuf, u64, SystemTime)> = Vec::new();
        let mut total: u64 = 0;

        let Ok(dir) = fs::read_dir(&self.dir) else { return };
        let access = self.access.lock().ok();
        for item in dir.flatten() {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(meta) = item.metadata() else { continue };
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let last_used = access
                .as_ref()
                .and_then(|a| a.get(&stem).copied())
                .or_else(|| meta.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);

            total += meta.len();
            entries.push((path, meta.len(), last_used));
        }
        drop(access);

        if total <= self.size_limit {
            return;
        }

        entries.sort_by_key(|(_, _, last_used)| *last_used);
        for (path, len, _) in entries {
            if total <= self.size_limit {
                break;
            }
            if fs::remove_file(&path).is_ok() {
                debug!(path = %path.display(), "evicted cache entry");
                total = total.saturating_sub(len);
            }
        }
    }
}
