//! Execution-chain completeness.
//!
//! Only `flowOut -> flowIn` edges take part. The trace is a depth-first search from the start
//! sentinel that tries every branch and never re-enters a visited block, so fan-out and cycles
//! both terminate.

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use serde::Serialize;
use serde_json::json;

use super::ResolvedFlow;
use crate::options::ValidatorOptions;
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::{BlockCategory, PortKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTrace {
    pub complete: bool,
    /// Blocks in the order the search first entered them.
    pub visited: Vec<String>,
    /// Last block the search entered before giving up. `None` when complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<String>,
}

/// Directed execution graph. Neighbors come back in insertion order, which keeps the
/// trace deterministic for a given connection order.
pub type ExecutionGraph<'a> = DiGraphMap<&'a str, ()>;

/// Execution edges of a flow: source port accepts `flowOut`, target port accepts `flowIn`.
/// Connections with a missing block, schema or port are dropped.
pub fn execution_graph<'a>(resolved: &ResolvedFlow<'a>) -> ExecutionGraph<'a> {
    let mut graph = DiGraphMap::new();
    for block in resolved.blocks() {
        graph.add_node(block.id.as_str());
    }
    let flow = resolved.flow;
    for connection in &flow.connections {
        let Some((source, target)) = resolved.ports_of(connection) else {
            continue;
        };
        if source.kinds.contains(PortKind::FlowOut) && target.kinds.contains(PortKind::FlowIn) {
            graph.add_edge(
                connection.source_block_id.as_str(),
                connection.target_block_id.as_str(),
                (),
            );
        }
    }
    graph
}

/// Does any execution path lead from `start` to `end`?
pub fn trace_chain(graph: &ExecutionGraph<'_>, start: &str, end: &str) -> ChainTrace {
    let mut visited: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        if !seen.insert(node) {
            continue;
        }
        visited.push(node.to_string());
        tracing::trace!(block = node, "chain visit");
        if node == end {
            return ChainTrace {
                complete: true,
                visited,
                broken_at: None,
            };
        }
        if !graph.contains_node(node) {
            continue;
        }
        // Reverse so the first-declared branch is explored first.
        let children: Vec<&str> = graph.neighbors(node).collect();
        for child in children.into_iter().rev() {
            if !seen.contains(child) {
                stack.push(child);
            }
        }
    }

    let broken_at = visited.last().cloned();
    ChainTrace {
        complete: false,
        visited,
        broken_at,
    }
}

/// Outcome of the chain stage, kept for the summary.
#[derive(Debug, Default)]
pub struct ChainAnalysis {
    pub findings: Findings,
    pub has_start: bool,
    /// End sentinel the trace targeted.
    pub end_block: Option<String>,
    pub trace: Option<ChainTrace>,
}

impl ChainAnalysis {
    pub fn end_reachable(&self) -> bool {
        self.trace.as_ref().is_some_and(|t| t.complete)
    }
}

pub fn check_chain(resolved: &ResolvedFlow<'_>, options: &ValidatorOptions) -> ChainAnalysis {
    let mut analysis = ChainAnalysis::default();
    let starts = resolved.block_ids_in(BlockCategory::Start);
    let ends = resolved.block_ids_in(BlockCategory::End);
    analysis.has_start = !starts.is_empty();

    match starts.as_slice() {
        [] => analysis.findings.push(Issue::error(
            Stage::Chain,
            codes::MISSING_START_BLOCK,
            "Flow has no start block",
        )),
        [_] => {}
        [_, rest @ ..] => analysis.findings.push(
            Issue::error(
                Stage::Chain,
                codes::MULTIPLE_START_BLOCKS,
                format!("Flow must have exactly 1 start block, found {}", starts.len()),
            )
            .on_block(rest[0])
            .with_context(json!({ "blockIds": starts })),
        ),
    }

    match ends.as_slice() {
        [] => analysis.findings.push(Issue::error(
            Stage::Chain,
            codes::MISSING_END_BLOCK,
            "Flow has no end block",
        )),
        [_] => {}
        [_, rest @ ..] => analysis.findings.push(
            Issue::warning(
                Stage::Chain,
                codes::MULTIPLE_END_BLOCKS,
                format!("Flow has {} end blocks; only the first is traced", ends.len()),
            )
            .on_block(rest[0])
            .with_context(json!({ "blockIds": ends })),
        ),
    }

    let graph = execution_graph(resolved);

    if let (Some(&start), Some(&end)) = (starts.first(), ends.first()) {
        let trace = trace_chain(&graph, start, end);
        if !trace.complete {
            let broken_at = trace.broken_at.as_deref().unwrap_or(start);
            analysis.findings.push(
                Issue::error(
                    Stage::Chain,
                    codes::BROKEN_FLOW_CHAIN,
                    format!(
                        "No execution path leads from start '{}' to end '{}'; chain stops at '{}'",
                        start, end, broken_at
                    ),
                )
                .on_block(broken_at)
                .with_context(json!({
                    "startBlockId": start,
                    "endBlockId": end,
                    "visited": trace.visited,
                })),
            );
        }
        analysis.end_block = Some(end.to_string());
        analysis.trace = Some(trace);
    }

    if options.report_execution_cycles && is_cyclic_directed(&graph) {
        analysis.findings.push(Issue::warning(
            Stage::Chain,
            codes::EXECUTION_CYCLE,
            "Execution connections form a cycle",
        ));
    }

    analysis
}
