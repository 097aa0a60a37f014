//! Per-source rate limiting.
//!
//! Two constraints per source: a minimum inter-call interval and a
//! sliding-window quota. `acquire` suspends the caller until both
//! clear — it never returns a premature grant. Remote rate-limit
//! rejections (HTTP 429 and friends) feed an exponential backoff with
//! jitter, capped in both delay and attempt count.

use rand::Rng;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

use paperscope_common::{SearchError, SourceId};
use paperscope_config::{RateLimitConfig, SourceRateConfig};

/// Mutable per-source record. Owned exclusively by the limiter; shared
/// across concurrent requests behind the state mutex.
#[derive(Debug, Default)]
struct SourceState {
    last_call: Option<Instant>,
    window_start: Option<Instant>,
    window_count: u32,
    consecutive_failures: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<HashMap<SourceId, SourceState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
        }
    }

    fn params(&self, source: SourceId) -> SourceRateConfig {
        self.config.for_source(source.as_str())
    }

    /// Grants after waiting the minimum necessary delay. State updates
    /// are atomic per source: the wait is computed under the lock, the
    /// sleep happens outside it, and the constraints are re-checked on
    /// wake before the grant is recorded.
    pub async fn acquire(&self, source: SourceId) {
        let cfg = self.params(source);
        let min_interval = Duration::from_millis(cfg.min_interval_ms);
        let window = Duration::from_secs(cfg.window_secs);

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let entry = state.entry(source).or_default();
                let now = Instant::now();

                // Roll the window over when it has elapsed
                match entry.window_start {
                    Some(start) if now.duration_since(start) < window => {}
                    _ => {
                        entry.window_start = Some(now);
                        entry.window_count = 0;
                    }
                }

                let interval_wait = entry
                    .last_call
                    .and_then(|last| min_interval.checked_sub(now.duration_since(last)))
                    .unwrap_or(Duration::ZERO);

                let quota_wait = if entry.window_count >= cfg.max_per_window {
                    let start = entry.window_start.unwrap_or(now);
                    window.saturating_sub(now.duration_since(start))
                } else {
                    Duration::ZERO
                };

                let wait = interval_wait.max(quota_wait);
                if wait.is_zero() {
                    entry.last_call = Some(now);
                    entry.window_count += 1;
                    return;
                }
                wait
            };

            debug!(source = %source, wait_ms = wait.as_millis() as u64, "rate limit wait");
            sleep(wait).await;
        }
    }

    /// Record a remote rate-limit rejection and return the delay to
    /// sleep before retrying. Doubles from the configured base with
    /// jitter, capped; past the retry cap the source is abandoned for
    /// this request with `RateLimitExceeded`.
    pub async fn backoff(&self, source: SourceId) -> Result<Duration, SearchError> {
        let cfg = self.params(source);

        let failures = {
            let mut state = self.state.lock().await;
            let entry = state.entry(source).or_default();
            entry.consecutive_failures += 1;
            entry.consecutive_failures
        };

        if failures > cfg.max_retries {
            return Err(SearchError::RateLimitExceeded { source_id: source });
        }

        let exp = cfg
            .backoff_base_ms
            .saturating_mul(1u64 << (failures - 1).min(16))
            .min(cfg.backoff_cap_ms);
        // Half fixed, half jittered, so the delay stays within
        // [exp/2, exp] while concurrent callers decorrelate.
        let jittered = exp / 2 + rand::thread_rng().gen_range(0..=exp / 2);

        debug!(source = %source, attempt = failures, delay_ms = jittered, "backoff");
        Ok(Duration::from_millis(jittered))
    }

    /// Clear the failure streak after a successful call.
    pub async fn reset(&self, source: SourceId) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.get_mut(&source) {
            entry.consecutive_failures = 0;
        }
    }
}
