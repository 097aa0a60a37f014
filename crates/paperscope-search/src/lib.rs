//! paperscope-search — Multi-source literature search aggregation engine.
//!
//! Pipeline: sanitize → cache lookup → field detection → source
//! selection → concurrent rate-limited adapter fan-out → dedup →
//! impact ranking → cache store.

pub mod cache;
pub mod dedup;
pub mod fields;
pub mod orchestrator;
pub mod rank;
pub mod ratelimit;
pub mod sanitize;
pub mod sources;
pub mod ttl;

pub use orchestrator::{SearchOrchestrator, SearchRequest};
pub use paperscope_common::{Paper, SearchError, SourceId};
pub use sources::{SearchFilters, SourceAdapter};
