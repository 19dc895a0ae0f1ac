//! Declarative parameter rules.
//!
//! Block types that ship a `validationRules.parameters` bundle are checked against it and
//! nothing else. Types without one fall back to the `required` flags on their declared
//! parameters when [`ValidatorOptions::fallback_parameter_checks`] is set.

use serde_json::{Map, Value, json};

use crate::flow::Block;
use crate::options::ValidatorOptions;
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::{AlternativeSource, BlockSchema, ParamKind, ParameterRules, PortKind};

/// Parameters the editor writes when a global variable replaces a typed-in value.
pub const USE_GLOBAL_VARIABLE: &str = "useGlobalVariable";
pub const SELECTED_GLOBAL_VARIABLE: &str = "selectedGlobalVariable";

/// Missing, `null` and blank strings count as absent. `0` and `false` are values.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Textual form of a scalar parameter, `None` when absent.
pub fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// A global variable is switched on and one is actually picked.
pub fn global_variable_selected(block: &Block) -> bool {
    truthy(block.param(USE_GLOBAL_VARIABLE)) && is_present(block.param(SELECTED_GLOBAL_VARIABLE))
}

/// A duration counts only when it is a positive number (or a numeric string).
fn positive_duration(value: Option<&Value>) -> bool {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.is_some_and(|n| n > 0.0)
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Comparison form of a parameter: absent, `null`, `false`, `0` and `""` all read as `""`.
fn comparable(params: &Map<String, Value>, id: &str) -> String {
    let value = params.get(id);
    if !truthy(value) {
        return String::new();
    }
    value.and_then(text_value).unwrap_or_default()
}

fn unquote(s: &str) -> String {
    s.trim().replace(['\'', '"'], "")
}

/// Evaluate `a === 'x'`, `a !== ''` and ` OR ` combinations of those.
/// Anything else evaluates to false.
pub fn evaluate_condition(params: &Map<String, Value>, condition: &str) -> bool {
    if condition.contains(" OR ") {
        return condition
            .split(" OR ")
            .any(|part| evaluate_condition(params, part));
    }
    if let Some((lhs, rhs)) = condition.split_once("!==") {
        return comparable(params, &unquote(lhs)) != unquote(rhs);
    }
    if let Some((lhs, rhs)) = condition.split_once("===") {
        return comparable(params, &unquote(lhs)) == unquote(rhs);
    }
    tracing::debug!(condition, "unsupported parameter condition");
    false
}

// =============================================================================
// RULE EVALUATION
// =============================================================================

/// Check one block's parameters. `input_connected(port_id)` answers whether an input port has
/// at least one incoming connection.
pub fn check_parameters(
    block: &Block,
    schema: &BlockSchema,
    input_connected: impl Fn(&str) -> bool,
    options: &ValidatorOptions,
) -> Findings {
    let mut findings = Findings::new();
    match schema.parameter_rules() {
        Some(rules) => apply_rules(block, schema, rules, &input_connected, &mut findings),
        None if options.fallback_parameter_checks => {
            for param in schema.parameters.iter().filter(|p| p.required) {
                if !is_present(block.param(&param.id)) {
                    let code = codes::MISSING_REQUIRED_PARAMETER;
                    findings.push(missing(block, schema, &param.id, code));
                }
            }
        }
        None => {}
    }
    findings
}

fn missing(block: &Block, schema: &BlockSchema, param_id: &str, code: &'static str) -> Issue {
    let label = schema.param_label(param_id);
    let message = match code {
        codes::MISSING_RECOMMENDED_PARAMETER => format!("Setting '{}' is recommended", label),
        codes::MISSING_PARAMETER_OR_ALTERNATIVE => {
            format!("'{}' has no value and no alternative source", label)
        }
        _ => format!("Required setting '{}' is missing", label),
    };
    let issue = if code == codes::MISSING_RECOMMENDED_PARAMETER {
        Issue::warning(Stage::Blocks, code, message)
    } else {
        Issue::error(Stage::Blocks, code, message)
    };
    issue
        .on_block(&block.id)
        .with_context(json!({ "parameter": param_id }))
}

fn apply_rules(
    block: &Block,
    schema: &BlockSchema,
    rules: &ParameterRules,
    input_connected: &impl Fn(&str) -> bool,
    findings: &mut Findings,
) {
    for id in &rules.required {
        if !is_present(block.param(id)) {
            findings.push(missing(block, schema, id, codes::MISSING_REQUIRED_PARAMETER));
        }
    }

    for id in &rules.recommended {
        if !is_present(block.param(id)) {
            findings.push(missing(block, schema, id, codes::MISSING_RECOMMENDED_PARAMETER));
        }
    }

    for rule in &rules.required_with_alternatives {
        if is_present(block.param(&rule.field)) {
            continue;
        }
        let satisfied = rule.alternatives.iter().any(|alt| match alt {
            AlternativeSource::Connection(port) => input_connected(port.as_str()),
            AlternativeSource::GlobalVariable => global_variable_selected(block),
        });
        if !satisfied {
            let alternatives: Vec<String> =
                rule.alternatives.iter().cloned().map(String::from).collect();
            findings.push(
                missing(block, schema, &rule.field, codes::MISSING_PARAMETER_OR_ALTERNATIVE)
                    .with_context(json!({ "parameter": rule.field, "alternatives": alternatives })),
            );
        }
    }

    for requirement in &rules.conditional_required {
        if !evaluate_condition(&block.parameters, &requirement.condition) {
            continue;
        }
        for id in &requirement.required_params {
            let is_duration = schema.param(id).is_some_and(|p| p.kind == ParamKind::Duration);
            let satisfied = if is_duration {
                positive_duration(block.param(id))
                    || data_input_connected(schema, input_connected)
                    || global_variable_selected(block)
            } else {
                is_present(block.param(id))
            };
            if satisfied {
                continue;
            }
            let label = schema.param_label(id);
            let message = if is_duration {
                format!(
                    "'{}' must be greater than 0 unless a variable or global variable supplies it",
                    label
                )
            } else {
                format!("Required setting '{}' is missing", label)
            };
            findings.push(
                Issue::error(Stage::Blocks, codes::MISSING_CONDITIONAL_PARAMETER, message)
                    .on_block(&block.id)
                    .with_context(json!({ "parameter": id, "condition": requirement.condition })),
            );
        }
    }
}

fn data_input_connected(schema: &BlockSchema, input_connected: &impl Fn(&str) -> bool) -> bool {
    schema
        .inputs
        .iter()
        .filter(|p| p.kinds.contains(PortKind::SetVarDataIn))
        .any(|p| input_connected(p.id.as_str()))
}
