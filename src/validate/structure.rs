//! Flow-level structural rules.

use std::collections::HashMap;

use serde_json::json;

use crate::flow::Flow;
use crate::report::{Findings, Issue, Stage, codes};

/// Run all structural rules. An empty flow yields exactly one `NO_BLOCKS` error.
pub fn check_structure(flow: &Flow) -> Findings {
    let mut findings = Findings::new();

    if flow.blocks.is_empty() {
        findings.push(Issue::error(
            Stage::Structure,
            codes::NO_BLOCKS,
            "Flow contains no blocks",
        ));
        return findings;
    }

    no_duplicate_block_ids(flow, &mut findings);
    findings
}

fn no_duplicate_block_ids(flow: &Flow, findings: &mut Findings) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (index, block) in flow.blocks.iter().enumerate() {
        if let Some(&first) = first_seen.get(block.id.as_str()) {
            findings.push(
                Issue::error(
                    Stage::Structure,
                    codes::DUPLICATE_BLOCK_ID,
                    format!("Block id '{}' is used more than once", block.id),
                )
                .on_block(&block.id)
                .with_context(json!({ "firstIndex": first, "index": index })),
            );
        } else {
            first_seen.insert(&block.id, index);
        }
    }
}
