//! Category rules for core and auxiliary blocks.

use serde_json::json;

use super::ResolvedFlow;
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::BlockCategory;

pub fn check_architecture(resolved: &ResolvedFlow<'_>) -> Findings {
    let mut findings = Findings::new();

    for block in resolved.blocks() {
        let Some(schema) = resolved.schema(block) else {
            continue;
        };
        let name = schema.display_name();

        match schema.category {
            BlockCategory::Start if !schema.has_execution_output() => findings.push(
                Issue::error(
                    Stage::Architecture,
                    codes::INVALID_BLOCK_TYPE,
                    format!("Start block '{}' ({}) has no execution output", block.id, name),
                )
                .on_block(&block.id),
            ),
            BlockCategory::End if !schema.has_execution_input() => findings.push(
                Issue::error(
                    Stage::Architecture,
                    codes::INVALID_BLOCK_TYPE,
                    format!("End block '{}' ({}) has no execution input", block.id, name),
                )
                .on_block(&block.id),
            ),
            BlockCategory::Core if !schema.exposes_execution_port() => findings.push(
                Issue::error(
                    Stage::Architecture,
                    codes::INVALID_BLOCK_TYPE,
                    format!("Core block '{}' ({}) has no execution port", block.id, name),
                )
                .on_block(&block.id),
            ),
            BlockCategory::Auxiliary => {
                if schema.exposes_execution_port() {
                    findings.push(
                        Issue::error(
                            Stage::Architecture,
                            codes::AUXILIARY_BLOCK_IN_MAIN_FLOW,
                            format!(
                                "Auxiliary block '{}' ({}) declares an execution port",
                                block.id, name
                            ),
                        )
                        .on_block(&block.id),
                    );
                }

                // Direct neighbors only.
                let attached = resolved
                    .graph
                    .neighbors(&block.id)
                    .into_iter()
                    .any(|n| resolved.category(n).is_some_and(BlockCategory::is_core));
                if !attached {
                    findings.push(
                        Issue::warning(
                            Stage::Architecture,
                            codes::ISOLATED_AUXILIARY_BLOCK,
                            format!(
                                "Auxiliary block '{}' ({}) is not connected to any core block",
                                block.id, name
                            ),
                        )
                        .on_block(&block.id)
                        .with_context(json!({ "connections": resolved.graph.degree(&block.id) })),
                    );
                }
            }
            _ => {}
        }
    }

    findings
}
