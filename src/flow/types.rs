//! Flow snapshot types.
//!
//! These types are the serde target for the editor's flow document. The validator only reads
//! them; the builder helpers exist for callers assembling a snapshot in memory.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// TOP-LEVEL FLOW
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Flow-wide variables selectable from block parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub globals: Map<String, Value>,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Add a connection and record it on both endpoint blocks, the way the editor does when a
    /// wire is committed. Endpoints missing from the block list are left untouched.
    pub fn connect(
        mut self,
        id: impl Into<String>,
        (source_block, source_port): (&str, &str),
        (target_block, target_port): (&str, &str),
    ) -> Self {
        let connection = Connection {
            id: id.into(),
            source_block_id: source_block.to_string(),
            source_port_id: source_port.to_string(),
            target_block_id: target_block.to_string(),
            target_port_id: target_port.to_string(),
        };
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == source_block) {
            block
                .connections
                .outputs
                .entry(source_port.to_string())
                .or_default()
                .push(connection.id.clone());
        }
        if let Some(block) = self.blocks.iter_mut().find(|b| b.id == target_block) {
            block
                .connections
                .inputs
                .entry(target_port.to_string())
                .or_default()
                .push(connection.id.clone());
        }
        self.connections.push(connection);
        self
    }

    /// First block carrying the given id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }
}

// =============================================================================
// BLOCKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    /// Block-type id resolved through the schema registry.
    #[serde(rename = "definitionId", alias = "type")]
    pub block_type: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub connections: BlockPorts,
}

/// Port id to connection ids, inputs and outputs kept apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPorts {
    pub inputs: IndexMap<String, Vec<String>>,
    pub outputs: IndexMap<String, Vec<String>>,
}

impl Block {
    pub fn new(id: impl Into<String>, block_type: impl Into<String>) -> Self {
        Block {
            id: id.into(),
            block_type: block_type.into(),
            parameters: Map::new(),
            connections: BlockPorts::default(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Connections the editor has recorded on one input port.
    pub fn input_count(&self, port_id: &str) -> usize {
        self.connections.inputs.get(port_id).map_or(0, Vec::len)
    }

    pub fn output_count(&self, port_id: &str) -> usize {
        self.connections.outputs.get(port_id).map_or(0, Vec::len)
    }
}

// =============================================================================
// CONNECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_block_id: String,
    pub source_port_id: String,
    pub target_block_id: String,
    pub target_port_id: String,
}

impl Connection {
    pub fn is_self_loop(&self) -> bool {
        self.source_block_id == self.target_block_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_editor_document() {
        let flow: Flow = serde_json::from_str(
            r#"{
                "name": "demo",
                "blocks": [
                    {"id": "s", "definitionId": "start", "position": {"x": 0, "y": 0}},
                    {"id": "e", "type": "end", "parameters": {"label": "done"},
                     "connections": {"inputs": {"i1": ["c1"]}}}
                ],
                "connections": [
                    {"id": "c1", "sourceBlockId": "s", "sourcePortId": "o1",
                     "targetBlockId": "e", "targetPortId": "i1"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(flow.blocks[0].block_type, "start");
        assert_eq!(flow.blocks[1].block_type, "end");
        assert_eq!(flow.blocks[1].input_count("i1"), 1);
        assert_eq!(flow.blocks[1].param("label"), Some(&Value::from("done")));
        assert!(flow.globals.is_empty());
    }

    #[test]
    fn connect_records_both_endpoints() {
        let flow = Flow::new()
            .with_block(Block::new("a", "start"))
            .with_block(Block::new("b", "end"))
            .connect("c1", ("a", "o1"), ("b", "i1"));
        assert_eq!(flow.connections.len(), 1);
        assert_eq!(flow.block("a").unwrap().output_count("o1"), 1);
        assert_eq!(flow.block("b").unwrap().input_count("i1"), 1);
        assert!(!flow.connection("c1").unwrap().is_self_loop());
    }
}
