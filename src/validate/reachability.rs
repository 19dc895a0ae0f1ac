//! Orphan detection.
//!
//! Reachability treats every connection as undirected, whatever its port kinds: a block hanging
//! off the chain through a data wire is still part of the program, and so is a helper feeding
//! another helper that feeds a live block.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use serde_json::json;

use super::ResolvedFlow;
use crate::flow::FlowGraph;
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::BlockCategory;

/// Iterative depth-first walk from all seeds at once, following edges both ways.
/// Seeds missing from the graph are ignored.
pub fn reachable_from<'g>(graph: &'g FlowGraph, seeds: &[&str]) -> HashSet<&'g str> {
    let mut reachable = HashSet::new();
    let mut stack: Vec<NodeIndex> = seeds
        .iter()
        .filter_map(|id| graph.node_indices.get(*id).copied())
        .collect();

    while let Some(idx) = stack.pop() {
        let id = graph.graph[idx].as_str();
        if !reachable.insert(id) {
            continue;
        }
        tracing::trace!(block = id, "reachable");
        for neighbor in graph.graph.neighbors_undirected(idx) {
            if !reachable.contains(graph.graph[neighbor].as_str()) {
                stack.push(neighbor);
            }
        }
    }
    reachable
}

#[derive(Debug, Default)]
pub struct OrphanAnalysis {
    pub findings: Findings,
    /// Unreachable block ids in flow order.
    pub orphaned: Vec<String>,
}

pub fn check_orphans(resolved: &ResolvedFlow<'_>) -> OrphanAnalysis {
    let mut analysis = OrphanAnalysis::default();
    let starts = resolved.block_ids_in(BlockCategory::Start);

    // Without a start nothing is reachable. The chain stage already reports the missing start,
    // so only the count is recorded here.
    if starts.is_empty() {
        analysis.orphaned = resolved.blocks().map(|b| b.id.clone()).collect();
        return analysis;
    }

    let reachable = reachable_from(&resolved.graph, &starts);

    for block in resolved.blocks() {
        if reachable.contains(block.id.as_str()) {
            continue;
        }
        analysis.orphaned.push(block.id.clone());

        let issue = match resolved.category(&block.id) {
            Some(BlockCategory::End) => Issue::error(
                Stage::Orphans,
                codes::END_UNREACHABLE,
                format!("End block '{}' cannot be reached from the start block", block.id),
            ),
            Some(category) if category.is_core() => Issue::error(
                Stage::Orphans,
                codes::ORPHANED_BLOCK,
                format!("Core block '{}' is not connected to the flow", block.id),
            ),
            _ => Issue::warning(
                Stage::Orphans,
                codes::ORPHANED_BLOCK,
                format!("Block '{}' is not connected to the flow", block.id),
            ),
        };
        analysis.findings.push(
            issue
                .on_block(&block.id)
                .with_context(json!({ "blockType": block.block_type })),
        );
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{Block, Flow};

    fn chain_flow() -> Flow {
        Flow::new()
            .with_block(Block::new("s", "start"))
            .with_block(Block::new("a", "core"))
            .with_block(Block::new("x", "core"))
            .with_block(Block::new("y", "core"))
            .connect("c1", ("s", "o"), ("a", "i"))
            // reversed edge: still reachable when traversing undirected
            .connect("c2", ("x", "o"), ("a", "i"))
    }

    #[test]
    fn traversal_follows_edges_both_ways() {
        let flow = chain_flow();
        let graph = FlowGraph::build(&flow);
        let reachable = reachable_from(&graph, &["s"]);
        assert_eq!(reachable, HashSet::from(["s", "a", "x"]));
    }

    #[test]
    fn block_attached_only_to_orphan_stays_orphaned() {
        let flow = chain_flow()
            .with_block(Block::new("z", "core"))
            .connect("c3", ("y", "o"), ("z", "i"));
        let graph = FlowGraph::build(&flow);
        let reachable = reachable_from(&graph, &["s"]);
        assert!(!reachable.contains("y"));
        assert!(!reachable.contains("z"));
    }

    #[test]
    fn helper_chains_are_reachable_through_any_depth() {
        let flow = chain_flow()
            .with_block(Block::new("h1", "aux"))
            .with_block(Block::new("h2", "aux"))
            .connect("c3", ("h1", "o"), ("a", "data"))
            .connect("c4", ("h2", "o"), ("h1", "data"));
        let graph = FlowGraph::build(&flow);
        let reachable = reachable_from(&graph, &["s"]);
        assert!(reachable.contains("h1"));
        assert!(reachable.contains("h2"));
    }

    #[test]
    fn unknown_seeds_reach_nothing() {
        let flow = chain_flow();
        let graph = FlowGraph::build(&flow);
        assert!(reachable_from(&graph, &["ghost"]).is_empty());
    }
}
