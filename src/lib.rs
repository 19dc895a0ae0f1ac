//! Static validation for node-based automation flows.
//!
//! A flow is a snapshot of blocks wired together through typed ports. [`FlowValidator`] checks
//! it against block-type schemas from a [`SchemaRegistry`] and returns a [`ValidationReport`].
//! Nothing here executes a flow or mutates the snapshot.

pub mod error;
pub mod flow;
pub mod options;
pub mod ports;
pub mod report;
pub mod schema;
pub mod validate;
pub mod wasm;

pub use error::EngineError;
pub use flow::{Block, Connection, Flow};
pub use options::ValidatorOptions;
pub use ports::{Compatibility, CompatibilityRule, CompatibilityTable};
pub use report::{Issue, Severity, Stage, ValidationReport};
pub use schema::{BlockSchema, CachedRegistry, SchemaCatalog, SchemaRegistry};
pub use validate::{ConnectionValidationResult, FlowValidator};
