//! Flow snapshot types, their JSON entry and a graph view.

pub mod graph;
pub mod types;

pub use graph::FlowGraph;
pub use types::*;

use crate::error::EngineError;

/// Deserialize a flow JSON document into a `Flow`.
pub fn parse(json: &str) -> Result<Flow, EngineError> {
    serde_json::from_str::<Flow>(json).map_err(EngineError::InvalidSnapshot)
}
