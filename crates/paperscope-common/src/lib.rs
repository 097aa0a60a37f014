//! paperscope-common — Shared types, errors, and the capped HTTP client
//! used across all Paperscope crates.

pub mod error;
pub mod models;
pub mod sandbox;

// Re-export commonly used types
pub use error::{Result, SearchError};
pub use models::{Author, Paper, SourceId};
