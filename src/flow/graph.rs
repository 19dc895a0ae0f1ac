//! petgraph-based directed graph view over a flow snapshot.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::Flow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabel {
    pub connection_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// One node per distinct block id, one edge per connection whose endpoints both exist.
/// Dangling connections are left out; the connection stage reports them.
pub struct FlowGraph {
    pub graph: DiGraph<String, EdgeLabel>,
    pub node_indices: HashMap<String, NodeIndex>,
}

impl FlowGraph {
    pub fn build(flow: &Flow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_indices = HashMap::new();

        for block in &flow.blocks {
            if node_indices.contains_key(&block.id) {
                continue;
            }
            let idx = graph.add_node(block.id.clone());
            node_indices.insert(block.id.clone(), idx);
        }

        for connection in &flow.connections {
            let (Some(&s), Some(&t)) = (
                node_indices.get(&connection.source_block_id),
                node_indices.get(&connection.target_block_id),
            ) else {
                continue;
            };
            graph.add_edge(
                s,
                t,
                EdgeLabel {
                    connection_id: connection.id.clone(),
                    source_port: connection.source_port_id.clone(),
                    target_port: connection.target_port_id.clone(),
                },
            );
        }

        FlowGraph {
            graph,
            node_indices,
        }
    }

    /// Blocks sharing at least one connection with `block_id`, in either direction.
    pub fn neighbors(&self, block_id: &str) -> Vec<&str> {
        let Some(&idx) = self.node_indices.get(block_id) else {
            return vec![];
        };
        self.graph
            .neighbors_undirected(idx)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    pub fn degree(&self, block_id: &str) -> usize {
        let Some(&idx) = self.node_indices.get(block_id) else {
            return 0;
        };
        self.graph.edges_directed(idx, Direction::Outgoing).count()
            + self.graph.edges_directed(idx, Direction::Incoming).count()
    }
}
