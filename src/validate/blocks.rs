//! Per-block checks: schema resolution, lifecycle flags, connection rules and parameters.

use serde_json::json;

use super::ResolvedFlow;
use super::parameters::check_parameters;
use crate::flow::Block;
use crate::options::ValidatorOptions;
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::{BlockSchema, ConnectionRules, PortDirection, PortKind};

pub fn check_blocks(resolved: &ResolvedFlow<'_>, options: &ValidatorOptions) -> Findings {
    let mut findings = Findings::new();

    for block in resolved.blocks() {
        let Some(schema) = resolved.schema(block) else {
            findings.push(
                Issue::error(
                    Stage::Blocks,
                    codes::MISSING_BLOCK_DEFINITION,
                    format!(
                        "Block '{}' uses unknown block type '{}'",
                        block.id, block.block_type
                    ),
                )
                .on_block(&block.id)
                .with_context(json!({ "blockType": block.block_type })),
            );
            continue;
        };

        if schema.deprecated {
            findings.push(
                Issue::warning(
                    Stage::Blocks,
                    codes::DEPRECATED_BLOCK,
                    format!("Block type '{}' is deprecated", schema.display_name()),
                )
                .on_block(&block.id),
            );
        }
        if schema.experimental {
            findings.push(
                Issue::warning(
                    Stage::Blocks,
                    codes::EXPERIMENTAL_BLOCK,
                    format!("Block type '{}' is experimental", schema.display_name()),
                )
                .on_block(&block.id),
            );
        }

        match schema.connection_rules() {
            Some(rules) => check_connection_rules(resolved, block, schema, rules, &mut findings),
            None => check_required_ports(resolved, block, schema, &mut findings),
        }

        findings.extend(check_parameters(
            block,
            schema,
            |port| resolved.input_connected(block, port),
            options,
        ));
    }

    findings
}

fn port_issue(
    code: &'static str,
    block: &Block,
    schema: &BlockSchema,
    direction: PortDirection,
    port_id: &str,
) -> Issue {
    let label = schema
        .port(direction, port_id)
        .map_or(port_id, |p| p.display_name());
    let (side, required) = match code {
        codes::MISSING_REQUIRED_INPUT => ("input", true),
        codes::MISSING_REQUIRED_OUTPUT => ("output", true),
        codes::MISSING_RECOMMENDED_INPUT => ("input", false),
        _ => ("output", false),
    };
    let issue = if required {
        Issue::error(
            Stage::Blocks,
            code,
            format!("Block '{}' requires a connection on {} '{}'", block.id, side, label),
        )
    } else {
        Issue::warning(
            Stage::Blocks,
            code,
            format!("Block '{}' should have a connection on {} '{}'", block.id, side, label),
        )
    };
    issue
        .on_block(&block.id)
        .with_context(json!({ "portId": port_id }))
}

fn check_connection_rules(
    resolved: &ResolvedFlow<'_>,
    block: &Block,
    schema: &BlockSchema,
    rules: &ConnectionRules,
    findings: &mut Findings,
) {
    use PortDirection::{Input, Output};

    let groups = [
        (&rules.required_inputs, Input, codes::MISSING_REQUIRED_INPUT),
        (&rules.required_outputs, Output, codes::MISSING_REQUIRED_OUTPUT),
        (&rules.recommended_inputs, Input, codes::MISSING_RECOMMENDED_INPUT),
        (&rules.recommended_outputs, Output, codes::MISSING_RECOMMENDED_OUTPUT),
    ];
    for (ports, direction, code) in groups {
        for port_id in ports {
            let connected = match direction {
                Input => resolved.input_connected(block, port_id),
                Output => resolved.output_connected(block, port_id),
            };
            if !connected {
                findings.push(port_issue(code, block, schema, direction, port_id));
            }
        }
    }
}

/// Fallback for types without a connection bundle: every port flagged `required` needs a wire.
/// Required variable inputs on core blocks belong to the variables stage.
fn check_required_ports(
    resolved: &ResolvedFlow<'_>,
    block: &Block,
    schema: &BlockSchema,
    findings: &mut Findings,
) {
    let inputs = schema
        .inputs
        .iter()
        .filter(|p| !(schema.category.is_core() && p.kinds.any(PortKind::is_variable)))
        .map(|p| (p, PortDirection::Input, resolved.input_connected(block, &p.id)));
    let outputs = schema
        .outputs
        .iter()
        .map(|p| (p, PortDirection::Output, resolved.output_connected(block, &p.id)));

    for (port, direction, connected) in inputs.chain(outputs) {
        if !port.required || connected {
            continue;
        }
        let side = match direction {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        };
        findings.push(
            Issue::error(
                Stage::Blocks,
                codes::REQUIRED_PORT_UNCONNECTED,
                format!(
                    "Required {} '{}' on block '{}' is not connected",
                    side,
                    port.display_name(),
                    block.id
                ),
            )
            .on_block(&block.id)
            .with_context(json!({ "portId": port.id, "portType": port.kinds.to_string() })),
        );
    }
}
