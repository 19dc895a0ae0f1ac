//! Engine failures that are not validation findings.
//!
//! Validation problems are always returned as [`Issue`](crate::report::Issue) data inside a
//! report. An `EngineError` means validation could not run at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The schema lookup capability failed (as opposed to returning "no such type").
    #[error("schema lookup for block type '{type_id}' failed: {reason}")]
    Registry { type_id: String, reason: String },

    #[error("failed to decode flow snapshot: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),

    #[error("failed to decode block schema catalog: {0}")]
    InvalidCatalog(#[source] serde_json::Error),

    #[error("failed to decode validator options: {0}")]
    InvalidOptions(#[source] serde_json::Error),
}

impl EngineError {
    pub fn registry(type_id: &str, reason: impl Into<String>) -> Self {
        EngineError::Registry {
            type_id: type_id.into(),
            reason: reason.into(),
        }
    }
}
