//! Live connection checks, the whole-flow connection pass and export consistency.

#[allow(dead_code)]
mod helpers;

use flowcheck::ports::{Compatibility, CompatibilityRule, CompatibilityTable};
use flowcheck::report::codes;
use flowcheck::schema::PortKind;
use flowcheck::validate::check_export_consistency;
use flowcheck::{Block, Flow, FlowValidator, ValidatorOptions};
use helpers::*;

#[test]
fn live_check_accepts_execution_wire() {
    let result = validator()
        .validate_connection(
            &Block::new("s", "start"),
            "o1",
            &Block::new("e", "end"),
            "i1",
        )
        .unwrap();
    assert!(result.valid);
    assert_eq!(result.compatibility, Compatibility::Exact);
    assert!(result.error.is_none());
    assert!(result.warning.is_none());
}

#[test]
fn live_check_rejects_self_loop() {
    let block = Block::new("a", "action");
    let result = validator()
        .validate_connection(&block, "flowOut", &block, "flowIn")
        .unwrap();
    assert!(!result.valid);
    assert_eq!(result.error.unwrap().code, codes::SELF_LOOP);
}

#[test]
fn live_check_reports_missing_ports_first() {
    let result = validator()
        .validate_connection(
            &Block::new("s", "start"),
            "o1",
            &Block::new("a", "action"),
            "nowhere",
        )
        .unwrap();
    let error = result.error.unwrap();
    assert_eq!(error.code, codes::MISSING_TARGET_PORT);
    assert_eq!(error.block_id.as_deref(), Some("a"));
}

#[test]
fn live_check_counts_existing_wires_on_target() {
    let flow = start_end();
    let end = flow.block("e").unwrap();
    let result = validator()
        .validate_connection(&Block::new("a", "action"), "flowOut", end, "i1")
        .unwrap();
    assert!(!result.valid);
    let error = result.error.unwrap();
    assert_eq!(error.code, codes::TOO_MANY_CONNECTIONS);
    assert_eq!(error.context.unwrap()["limit"], 1);

    // Merge-style inputs declare themselves unbounded.
    let merge = Flow::new()
        .with_block(Block::new("s", "start"))
        .with_block(Block::new("m", "merge"))
        .connect("c1", ("s", "o1"), ("m", "flowIn"));
    let result = validator()
        .validate_connection(
            &Block::new("a", "action"),
            "flowOut",
            merge.block("m").unwrap(),
            "flowIn",
        )
        .unwrap();
    assert!(result.valid);
}

#[test]
fn loop_body_into_execution_input_is_a_conversion() {
    let result = validator()
        .validate_connection(
            &Block::new("l", "loop"),
            "body",
            &Block::new("a", "action"),
            "flowIn",
        )
        .unwrap();
    assert!(result.valid);
    assert_eq!(result.compatibility, Compatibility::Conversion);
    assert_eq!(result.warning.unwrap().code, codes::PORT_CONVERSION);
}

#[test]
fn composite_target_accepts_any_listed_kind() {
    let validator = validator();
    let cond = Block::new("cond", "if");
    let name = validator
        .validate_connection(&Block::new("n", "setVarName"), "out", &cond, "condition")
        .unwrap();
    let data = validator
        .validate_connection(&Block::new("r", "getVar"), "out", &cond, "condition")
        .unwrap();
    assert!(name.valid && data.valid);
    let flow_wire = validator
        .validate_connection(&Block::new("s", "start"), "o1", &cond, "condition")
        .unwrap();
    assert_eq!(flow_wire.error.unwrap().code, codes::PORT_TYPE_MISMATCH);
}

#[test]
fn compatibility_is_one_directional_until_declared() {
    let mut table = CompatibilityTable::standard();
    assert!(table.is_compatible(PortKind::SetVarDataOut, PortKind::SetVarDataIn));
    assert!(!table.is_compatible(PortKind::SetVarDataIn, PortKind::SetVarDataOut));

    let (read, action) = (Block::new("r", "getVar"), Block::new("a", "action"));
    let validator = FlowValidator::new(catalog()).with_compatibility(table.clone());
    let rejected = validator
        .validate_connection(&read, "out", &action, "flowIn")
        .unwrap();
    assert!(!rejected.valid);

    table.add_rule(CompatibilityRule::new(PortKind::SetVarDataOut, [PortKind::FlowIn]));
    let validator = FlowValidator::new(catalog()).with_compatibility(table);
    let accepted = validator
        .validate_connection(&read, "out", &action, "flowIn")
        .unwrap();
    assert!(accepted.valid);
    assert_eq!(accepted.compatibility, Compatibility::Conversion);
}

#[test]
fn bulk_pass_flags_only_wires_beyond_the_limit() {
    let flow = Flow::new()
        .with_block(Block::new("s", "start"))
        .with_block(Block::new("a", "action"))
        .with_block(Block::new("b", "action"))
        .with_block(Block::new("e", "end"))
        .connect("c1", ("s", "o1"), ("a", "flowIn"))
        .connect("c2", ("a", "flowOut"), ("e", "i1"))
        .connect("c3", ("b", "flowOut"), ("e", "i1"));
    let report = validate(&flow);
    let issue = assert_has_error(&report, codes::TOO_MANY_CONNECTIONS);
    assert_eq!(issue.connection_id.as_deref(), Some("c3"));
    assert_eq!(issue.block_id.as_deref(), Some("e"));
    assert_eq!(report.errors_with_code(codes::TOO_MANY_CONNECTIONS).count(), 1);
    assert_eq!(report.summary.valid_connections, 2);
    assert_eq!(report.summary.invalid_connections, 1);

    let options = ValidatorOptions {
        default_input_limit: None,
        ..ValidatorOptions::default()
    };
    let report = validator_with(options).validate_flow(&flow).unwrap();
    assert!(report.errors_with_code(codes::TOO_MANY_CONNECTIONS).next().is_none());
}

#[test]
fn dangling_connection_is_an_error_not_a_crash() {
    let flow = start_end().connect("c2", ("ghost", "flowOut"), ("e", "i1"));
    let report = validate(&flow);
    let issue = assert_has_error(&report, codes::MISSING_SOURCE_BLOCK);
    assert_eq!(issue.connection_id.as_deref(), Some("c2"));
    assert_eq!(report.summary.invalid_connections, 1);

    let flow = start_end().connect("c2", ("s", "o1"), ("ghost", "i1"));
    assert_has_error(&validate(&flow), codes::MISSING_TARGET_BLOCK);
}

#[test]
fn export_consistency_after_block_deletion() {
    let mut flow = parse(include_str!("fixtures/branching.json"));
    assert!(check_export_consistency(&flow).consistent);

    flow.blocks.retain(|b| b.id != "dead");
    let consistency = check_export_consistency(&flow);
    assert!(!consistency.consistent);
    assert_eq!(consistency.orphaned_connections, vec!["c2"]);
    assert_eq!(consistency.missing_blocks, vec!["dead"]);
}
