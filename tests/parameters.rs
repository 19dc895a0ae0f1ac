//! Parameter rules evaluated inside whole-flow validation.

#[allow(dead_code)]
mod helpers;

use flowcheck::report::codes;
use flowcheck::validate::check_export_consistency;
use flowcheck::{Block, ValidatorOptions};
use helpers::*;
use serde_json::json;

fn actuator() -> Block {
    Block::new("act", "actuator")
        .with_param("deviceType", "relay")
        .with_param("label", "Pump")
        .with_param("target", 40)
}

#[test]
fn configured_actuator_is_clean() {
    assert_clean(&validate(&through(actuator())));
}

#[test]
fn missing_required_and_recommended_settings() {
    let mut block = actuator();
    block.parameters.remove("deviceType");
    block.parameters.insert("label".into(), json!(""));
    let report = validate(&through(block));

    let issue = assert_has_error(&report, codes::MISSING_REQUIRED_PARAMETER);
    assert_eq!(issue.block_id.as_deref(), Some("act"));
    assert_eq!(issue.context.as_ref().unwrap()["parameter"], "deviceType");
    assert!(issue.message.contains("Device type"));
    assert_has_warning(&report, codes::MISSING_RECOMMENDED_PARAMETER);
}

#[test]
fn zero_counts_as_a_value() {
    let block = actuator().with_param("target", 0);
    assert_clean(&validate(&through(block)));
}

#[test]
fn alternative_sources_for_a_missing_value() {
    let mut block = actuator();
    block.parameters.remove("target");
    let report = validate(&through(block.clone()));
    let issue = assert_has_error(&report, codes::MISSING_PARAMETER_OR_ALTERNATIVE);
    assert_eq!(
        issue.context.as_ref().unwrap()["alternatives"],
        json!(["connection:setVarDataIn", "globalVariable"])
    );

    // A global variable selection stands in for the value.
    let global = block
        .clone()
        .with_param("useGlobalVariable", true)
        .with_param("selectedGlobalVariable", "setpoint");
    assert_clean(&validate(&through(global)));

    // So does a wired data input.
    let wired = through(block)
        .with_block(Block::new("n", "setVarName").with_param("name", "setpoint"))
        .with_block(Block::new("read", "getVar").with_param("variableName", "setpoint"))
        .connect("c3", ("read", "out"), ("act", "setVarDataIn"));
    let report = validate(&wired);
    assert!(
        report.errors_with_code(codes::MISSING_PARAMETER_OR_ALTERNATIVE).next().is_none(),
        "{:#?}",
        report.errors
    );
}

#[test]
fn selected_flag_without_a_variable_is_not_a_selection() {
    let mut block = actuator().with_param("useGlobalVariable", true);
    block.parameters.remove("target");
    let report = validate(&through(block));
    assert_has_error(&report, codes::MISSING_PARAMETER_OR_ALTERNATIVE);
}

#[test]
fn duration_required_for_timed_actions() {
    for action in ["pulse", "timed"] {
        let block = actuator().with_param("actionType", action);
        let report = validate(&through(block.clone()));
        let issue = assert_has_error(&report, codes::MISSING_CONDITIONAL_PARAMETER);
        assert_eq!(issue.context.as_ref().unwrap()["parameter"], "duration");

        let zero = block.clone().with_param("duration", 0);
        assert_has_error(&validate(&through(zero)), codes::MISSING_CONDITIONAL_PARAMETER);

        let set = block.with_param("duration", 1500);
        assert_clean(&validate(&through(set)));
    }

    let toggle = actuator().with_param("actionType", "toggle");
    assert_clean(&validate(&through(toggle)));
}

#[test]
fn duration_may_come_from_a_global_variable() {
    let block = actuator()
        .with_param("actionType", "pulse")
        .with_param("useGlobalVariable", true)
        .with_param("selectedGlobalVariable", "pulseLength");
    assert_clean(&validate(&through(block)));
}

#[test]
fn required_flag_applies_without_rules() {
    let report = validate(&through(Block::new("t", "timer")));
    let issue = assert_has_error(&report, codes::MISSING_REQUIRED_PARAMETER);
    assert_eq!(issue.block_id.as_deref(), Some("t"));

    let options = ValidatorOptions {
        fallback_parameter_checks: false,
        ..ValidatorOptions::default()
    };
    let report = validator_with(options)
        .validate_flow(&through(Block::new("t", "timer")))
        .unwrap();
    assert_clean(&report);

    let configured = Block::new("t", "timer").with_param("interval", "5s");
    assert_clean(&validate(&through(configured)));
}

#[test]
fn rule_bundle_ports_are_checked() {
    // Only the outgoing wire; the required execution input is missing.
    let flow = flowcheck::Flow::new()
        .with_block(Block::new("s", "start"))
        .with_block(actuator())
        .with_block(Block::new("e", "end"))
        .connect("c1", ("act", "flowOut"), ("e", "i1"));
    let report = validate(&flow);
    let issue = assert_has_error(&report, codes::MISSING_REQUIRED_INPUT);
    assert_eq!(issue.context.as_ref().unwrap()["portId"], "flowIn");

    let flow = flowcheck::Flow::new()
        .with_block(Block::new("s", "start"))
        .with_block(actuator())
        .with_block(Block::new("e", "end"))
        .connect("c1", ("s", "o1"), ("act", "flowIn"));
    let report = validate(&flow);
    let issue = assert_has_warning(&report, codes::MISSING_RECOMMENDED_OUTPUT);
    assert_eq!(issue.block_id.as_deref(), Some("act"));
}

#[test]
fn stale_port_map_entry_is_not_an_alternative_source() {
    let mut block = actuator();
    block.parameters.remove("target");
    block
        .connections
        .inputs
        .insert("setVarDataIn".into(), vec!["deleted".into()]);
    let flow = through(block);

    let report = validate(&flow);
    let issue = assert_has_error(&report, codes::MISSING_PARAMETER_OR_ALTERNATIVE);
    assert_eq!(issue.block_id.as_deref(), Some("act"));

    let consistency = check_export_consistency(&flow);
    assert!(!consistency.consistent);
    assert_eq!(consistency.stale_port_references, vec!["act/setVarDataIn/deleted"]);
}

#[test]
fn stale_port_map_entry_does_not_satisfy_a_duration() {
    let mut block = actuator().with_param("actionType", "pulse");
    block
        .connections
        .inputs
        .insert("setVarDataIn".into(), vec!["deleted".into()]);
    let report = validate(&through(block));
    assert_has_error(&report, codes::MISSING_CONDITIONAL_PARAMETER);
}
