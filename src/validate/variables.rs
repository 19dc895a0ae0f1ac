//! Variable definition/use consistency.
//!
//! Schemas declare which parameter names a variable (`variable: {"defines": ...}`) or refers to
//! one (`variable: {"consumes": ...}`).

use indexmap::IndexMap;
use serde_json::json;

use super::ResolvedFlow;
use super::connection::ConnectionPartition;
use super::parameters::text_value;
use crate::flow::Block;
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::{PortKind, VariableRole};

pub fn check_variables(
    resolved: &ResolvedFlow<'_>,
    connections: &ConnectionPartition<'_>,
) -> Findings {
    let mut findings = Findings::new();
    let mut definers: IndexMap<String, Vec<&str>> = IndexMap::new();
    let mut consumers: Vec<(&Block, Option<String>)> = Vec::new();

    for block in resolved.blocks() {
        let Some(schema) = resolved.schema(block) else {
            continue;
        };
        match &schema.variable {
            Some(VariableRole::Defines(param)) => {
                if let Some(name) = block.param(param).and_then(text_value) {
                    definers.entry(name).or_default().push(&block.id);
                }
            }
            Some(VariableRole::Consumes(param)) => {
                consumers.push((block, block.param(param).and_then(text_value)));
            }
            None => {}
        }
    }

    for (block, reference) in &consumers {
        match reference {
            None => findings.push(
                Issue::warning(
                    Stage::Variables,
                    codes::VARIABLE_CHAIN_BROKEN,
                    format!("Block '{}' does not reference a variable", block.id),
                )
                .on_block(&block.id),
            ),
            Some(name) if !definers.contains_key(name) => findings.push(
                Issue::error(
                    Stage::Variables,
                    codes::UNDEFINED_VARIABLE,
                    format!("Block '{}' uses undefined variable '{}'", block.id, name),
                )
                .on_block(&block.id)
                .with_context(json!({ "variable": name })),
            ),
            Some(_) => {}
        }
    }

    for (name, blocks) in &definers {
        if blocks.len() > 1 {
            findings.push(
                Issue::warning(
                    Stage::Variables,
                    codes::VARIABLE_NAME_DUPLICATE,
                    format!("Variable '{}' is defined by {} blocks", name, blocks.len()),
                )
                .on_block(blocks[1])
                .with_context(json!({ "variable": name, "blockIds": blocks })),
            );
        }
        let used = consumers
            .iter()
            .any(|(_, reference)| reference.as_deref() == Some(name.as_str()));
        if !used {
            findings.push(
                Issue::warning(
                    Stage::Variables,
                    codes::UNUSED_VARIABLE,
                    format!("Variable '{}' is never used", name),
                )
                .on_block(blocks[0])
                .with_context(json!({ "variable": name })),
            );
        }
    }

    check_required_variable_ports(resolved, connections, &mut findings);
    findings
}

/// Core blocks whose schema requires a variable-carrying input need an accepted wire on it.
/// Ports the connection rule bundle already lists as required are left to the blocks stage.
fn check_required_variable_ports(
    resolved: &ResolvedFlow<'_>,
    connections: &ConnectionPartition<'_>,
    findings: &mut Findings,
) {
    for block in resolved.blocks() {
        let Some(schema) = resolved.schema(block) else {
            continue;
        };
        if !schema.category.is_core() {
            continue;
        }
        let bundled = schema
            .connection_rules()
            .map(|r| r.required_inputs.as_slice())
            .unwrap_or_default();
        for port in &schema.inputs {
            let checked = port.required && port.kinds.any(PortKind::is_variable);
            if !checked || bundled.contains(&port.id) {
                continue;
            }
            if connections.inbound(&block.id, &port.id) == 0 {
                findings.push(
                    Issue::error(
                        Stage::Variables,
                        codes::REQUIRED_PORT_UNCONNECTED,
                        format!(
                            "Required input '{}' on block '{}' is not connected",
                            port.display_name(),
                            block.id
                        ),
                    )
                    .on_block(&block.id)
                    .with_context(json!({ "portId": port.id, "portType": port.kinds.to_string() })),
                );
            }
        }
    }
}
