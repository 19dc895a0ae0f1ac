//! Flow validation.
//!
//! [`FlowValidator`] resolves every block type once, runs each analysis over the same read-only
//! [`ResolvedFlow`], and folds the findings into one [`ValidationReport`]. Analyses never see
//! each other's results; only the final consolidation step does.

pub mod architecture;
pub mod blocks;
pub mod chain;
pub mod connection;
pub mod parameters;
pub mod reachability;
pub mod structure;
pub mod variables;

pub use chain::{ChainTrace, trace_chain};
pub use connection::{ConnectionValidationResult, ExportConsistency, check_export_consistency};
pub use reachability::reachable_from;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::EngineError;
use crate::flow::{Block, Connection, Flow, FlowGraph};
use crate::options::ValidatorOptions;
use crate::ports::CompatibilityTable;
use crate::report::{BlockStatus, Findings, Stage, Summary, ValidationReport, codes};
use crate::schema::{BlockCategory, BlockSchema, PortDef, SchemaRegistry};

// =============================================================================
// RESOLVED FLOW
// =============================================================================

/// A flow snapshot with its schemas looked up and its connections indexed.
pub struct ResolvedFlow<'a> {
    pub flow: &'a Flow,
    pub graph: FlowGraph,
    /// First block per id, in flow order.
    blocks: IndexMap<&'a str, &'a Block>,
    /// Found schemas by block-type id. Unknown types are absent.
    schemas: HashMap<&'a str, Arc<BlockSchema>>,
    /// block id -> port id -> incoming connection count.
    inbound: HashMap<&'a str, HashMap<&'a str, usize>>,
    outbound: HashMap<&'a str, HashMap<&'a str, usize>>,
}

impl<'a> ResolvedFlow<'a> {
    /// Look up each distinct block type once. A registry failure aborts resolution.
    pub fn resolve<R: SchemaRegistry + ?Sized>(
        flow: &'a Flow,
        registry: &R,
    ) -> Result<Self, EngineError> {
        let mut blocks = IndexMap::new();
        let mut schemas = HashMap::new();
        let mut unknown = HashSet::new();

        for block in &flow.blocks {
            blocks.entry(block.id.as_str()).or_insert(block);
            let type_id = block.block_type.as_str();
            if schemas.contains_key(type_id) || unknown.contains(type_id) {
                continue;
            }
            match registry.block_schema(type_id)? {
                Some(schema) => {
                    schemas.insert(type_id, schema);
                }
                None => {
                    tracing::debug!(type_id, "block type not registered");
                    unknown.insert(type_id);
                }
            }
        }

        let mut inbound: HashMap<&str, HashMap<&str, usize>> = HashMap::new();
        let mut outbound: HashMap<&str, HashMap<&str, usize>> = HashMap::new();
        for c in &flow.connections {
            *inbound
                .entry(c.target_block_id.as_str())
                .or_default()
                .entry(c.target_port_id.as_str())
                .or_default() += 1;
            *outbound
                .entry(c.source_block_id.as_str())
                .or_default()
                .entry(c.source_port_id.as_str())
                .or_default() += 1;
        }

        Ok(ResolvedFlow {
            flow,
            graph: FlowGraph::build(flow),
            blocks,
            schemas,
            inbound,
            outbound,
        })
    }

    /// Distinct blocks in flow order.
    pub fn blocks(&self) -> impl Iterator<Item = &'a Block> + '_ {
        self.blocks.values().copied()
    }

    pub fn block(&self, id: &str) -> Option<&'a Block> {
        self.blocks.get(id).copied()
    }

    pub fn schema(&self, block: &Block) -> Option<&BlockSchema> {
        self.schemas.get(block.block_type.as_str()).map(Arc::as_ref)
    }

    pub fn category(&self, block_id: &str) -> Option<BlockCategory> {
        self.block(block_id)
            .and_then(|b| self.schema(b))
            .map(|s| s.category)
    }

    /// Ids of blocks whose schema has the given category, in flow order.
    pub fn block_ids_in(&self, category: BlockCategory) -> Vec<&'a str> {
        self.blocks()
            .filter(|b| self.schema(b).is_some_and(|s| s.category == category))
            .map(|b| b.id.as_str())
            .collect()
    }

    pub fn inbound(&self, block_id: &str, port_id: &str) -> usize {
        self.inbound
            .get(block_id)
            .and_then(|ports| ports.get(port_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn outbound(&self, block_id: &str, port_id: &str) -> usize {
        self.outbound
            .get(block_id)
            .and_then(|ports| ports.get(port_id))
            .copied()
            .unwrap_or(0)
    }

    /// Wired per the flow's connection list. Ids left in a block's own port map do not count.
    pub fn input_connected(&self, block: &Block, port_id: &str) -> bool {
        self.inbound(&block.id, port_id) > 0
    }

    pub fn output_connected(&self, block: &Block, port_id: &str) -> bool {
        self.outbound(&block.id, port_id) > 0
    }

    /// Declared source output and target input of a connection, if both resolve.
    pub fn ports_of(&self, connection: &Connection) -> Option<(&PortDef, &PortDef)> {
        let source = self
            .schema(self.block(&connection.source_block_id)?)?
            .output(&connection.source_port_id)?;
        let target = self
            .schema(self.block(&connection.target_block_id)?)?
            .input(&connection.target_port_id)?;
        Some((source, target))
    }
}

// =============================================================================
// AGGREGATOR
// =============================================================================

/// Validation entry point. Holds the schema registry, the compatibility table and the options;
/// no state carries over between calls.
pub struct FlowValidator<R> {
    registry: R,
    table: CompatibilityTable,
    options: ValidatorOptions,
}

impl<R: SchemaRegistry> FlowValidator<R> {
    pub fn new(registry: R) -> Self {
        FlowValidator {
            registry,
            table: CompatibilityTable::standard(),
            options: ValidatorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ValidatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_compatibility(mut self, table: CompatibilityTable) -> Self {
        self.table = table;
        self
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    pub fn compatibility(&self) -> &CompatibilityTable {
        &self.table
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Validate a whole flow. `Err` means validation could not run; problems in the flow are
    /// always reported inside the `Ok` report.
    #[tracing::instrument(
        skip_all,
        fields(blocks = flow.blocks.len(), connections = flow.connections.len())
    )]
    pub fn validate_flow(&self, flow: &Flow) -> Result<ValidationReport, EngineError> {
        let mut run = Run::default();

        let structure = structure::check_structure(flow);
        if flow.blocks.is_empty() {
            run.record(Stage::Structure, structure);
            return Ok(run.finish(Summary::default(), IndexMap::new()));
        }
        run.record(Stage::Structure, structure);

        let resolved = ResolvedFlow::resolve(flow, &self.registry)?;

        run.record(Stage::Blocks, blocks::check_blocks(&resolved, &self.options));

        let partition = connection::check_connections(&resolved, &self.table, &self.options);
        run.record(Stage::Connections, partition.findings());

        let chain = chain::check_chain(&resolved, &self.options);
        run.record(Stage::Chain, chain.findings.clone());

        run.record(
            Stage::Architecture,
            architecture::check_architecture(&resolved),
        );
        run.record(
            Stage::Variables,
            variables::check_variables(&resolved, &partition),
        );

        let mut orphans = reachability::check_orphans(&resolved);
        // A broken chain to an end block and that end being unreachable share one root cause.
        if let (Some(trace), Some(end)) = (&chain.trace, &chain.end_block) {
            if !trace.complete {
                orphans.findings.errors.retain(|issue| {
                    !(issue.code == codes::END_UNREACHABLE && issue.block_id.as_ref() == Some(end))
                });
            }
        }
        run.record(Stage::Orphans, orphans.findings);

        let block_results = run.block_statuses(&resolved);
        let invalid_blocks = block_results
            .values()
            .filter(|s| **s == BlockStatus::Error)
            .count();

        let summary = Summary {
            total_blocks: flow.blocks.len(),
            valid_blocks: flow.blocks.len() - invalid_blocks,
            invalid_blocks,
            total_connections: flow.connections.len(),
            valid_connections: partition.valid.len(),
            invalid_connections: partition.invalid.len(),
            has_start_block: chain.has_start,
            has_end_reachable: chain.end_reachable(),
            orphaned_blocks: orphans.orphaned.len(),
            ..Summary::default()
        };

        let block_results = if self.options.include_block_results {
            block_results
        } else {
            IndexMap::new()
        };
        Ok(run.finish(summary, block_results))
    }

    /// Check one proposed connection before it is committed. The blocks' recorded port maps
    /// supply the existing load on each port.
    pub fn validate_connection(
        &self,
        source_block: &Block,
        source_port: &str,
        target_block: &Block,
        target_port: &str,
    ) -> Result<ConnectionValidationResult, EngineError> {
        let source_schema = self.registry.block_schema(&source_block.block_type)?;
        let target_schema = self.registry.block_schema(&target_block.block_type)?;

        let source = connection::Endpoint {
            block_id: &source_block.id,
            block_type: &source_block.block_type,
            schema: source_schema.as_deref(),
            port_id: source_port,
            load: source_block.output_count(source_port),
        };
        let target = connection::Endpoint {
            block_id: &target_block.id,
            block_type: &target_block.block_type,
            schema: target_schema.as_deref(),
            port_id: target_port,
            load: target_block.input_count(target_port),
        };
        Ok(connection::check_endpoints(
            &self.table,
            &self.options,
            &source,
            &target,
        ))
    }
}

/// Accumulates stage findings in run order.
#[derive(Default)]
struct Run {
    findings: Findings,
    passed: usize,
    failed: usize,
}

impl Run {
    fn record(&mut self, stage: Stage, findings: Findings) {
        tracing::debug!(
            %stage,
            errors = findings.errors.len(),
            warnings = findings.warnings.len(),
            "stage complete"
        );
        if findings.has_errors() {
            self.failed += 1;
        } else {
            self.passed += 1;
        }
        self.findings.extend(findings);
    }

    /// Worst severity attributed to each block.
    fn block_statuses(&self, resolved: &ResolvedFlow<'_>) -> IndexMap<String, BlockStatus> {
        let mut statuses: IndexMap<String, BlockStatus> = resolved
            .blocks()
            .map(|b| (b.id.clone(), BlockStatus::Valid))
            .collect();
        for issue in &self.findings.warnings {
            if let Some(status) = issue.block_id.as_ref().and_then(|id| statuses.get_mut(id)) {
                if *status == BlockStatus::Valid {
                    *status = BlockStatus::Warning;
                }
            }
        }
        for issue in &self.findings.errors {
            if let Some(status) = issue.block_id.as_ref().and_then(|id| statuses.get_mut(id)) {
                *status = BlockStatus::Error;
            }
        }
        statuses
    }

    fn finish(
        self,
        mut summary: Summary,
        block_results: IndexMap<String, BlockStatus>,
    ) -> ValidationReport {
        summary.checks_passed = self.passed;
        summary.checks_failed = self.failed;
        let is_valid = self.findings.errors.is_empty();
        tracing::debug!(
            is_valid,
            errors = self.findings.errors.len(),
            warnings = self.findings.warnings.len(),
            "validation finished"
        );
        ValidationReport {
            is_valid,
            errors: self.findings.errors,
            warnings: self.findings.warnings,
            summary,
            block_results,
        }
    }
}
