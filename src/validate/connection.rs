//! Single-edge checks, shared by live drag-and-drop feedback and whole-flow validation.
//!
//! Checks run in a fixed order and stop at the first failure: ports exist, no self-loop,
//! kinds compatible, port not over-subscribed.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::json;

use super::ResolvedFlow;
use crate::flow::{Connection, Flow};
use crate::options::ValidatorOptions;
use crate::ports::{Compatibility, CompatibilityTable};
use crate::report::{Findings, Issue, Stage, codes};
use crate::schema::{BlockSchema, ConnectionLimit, PortDef, PortDirection};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Issue>,
    /// Set for legal connections that still deserve a flag in the editor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Issue>,
    pub compatibility: Compatibility,
}

impl ConnectionValidationResult {
    fn rejected(error: Issue) -> Self {
        ConnectionValidationResult {
            valid: false,
            error: Some(error),
            warning: None,
            compatibility: Compatibility::Incompatible,
        }
    }

    fn on_connection(mut self, connection_id: &str) -> Self {
        self.error = self.error.map(|e| e.on_connection(connection_id));
        self.warning = self.warning.map(|w| w.on_connection(connection_id));
        self
    }
}

/// One side of a proposed connection.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub block_id: &'a str,
    pub block_type: &'a str,
    pub schema: Option<&'a BlockSchema>,
    pub port_id: &'a str,
    /// Connections already attached to this port, not counting the one under test.
    pub load: usize,
}

impl Endpoint<'_> {
    fn port(&self, direction: PortDirection) -> Option<&PortDef> {
        self.schema.and_then(|s| s.port(direction, self.port_id))
    }
}

/// Connection limit for a port: its own override, else the policy default for its direction.
pub fn port_limit(
    port: &PortDef,
    direction: PortDirection,
    options: &ValidatorOptions,
) -> Option<usize> {
    match port.max_connections {
        Some(ConnectionLimit::Unbounded) => None,
        Some(ConnectionLimit::AtMost(n)) => Some(n),
        None => match direction {
            PortDirection::Input => options.default_input_limit,
            PortDirection::Output => None,
        },
    }
}

fn missing_port(end: &Endpoint<'_>, direction: PortDirection) -> Issue {
    let (code, side) = match direction {
        PortDirection::Output => (codes::MISSING_SOURCE_PORT, "output"),
        PortDirection::Input => (codes::MISSING_TARGET_PORT, "input"),
    };
    let message = match end.schema {
        Some(schema) => format!(
            "Block '{}' ({}) has no {} port '{}'",
            end.block_id,
            schema.display_name(),
            side,
            end.port_id
        ),
        None => format!(
            "Block '{}' has unregistered type '{}', so {} port '{}' cannot be resolved",
            end.block_id, end.block_type, side, end.port_id
        ),
    };
    Issue::error(Stage::Connections, code, message)
        .on_block(end.block_id)
        .with_context(json!({ "portId": end.port_id }))
}

fn over_limit(end: &Endpoint<'_>, port: &PortDef, limit: usize) -> Issue {
    Issue::error(
        Stage::Connections,
        codes::TOO_MANY_CONNECTIONS,
        format!(
            "Port '{}' on block '{}' accepts at most {} connection(s)",
            port.display_name(),
            end.block_id,
            limit
        ),
    )
    .on_block(end.block_id)
    .with_context(json!({ "portId": port.id, "limit": limit, "existing": end.load }))
}

pub fn check_endpoints(
    table: &CompatibilityTable,
    options: &ValidatorOptions,
    source: &Endpoint<'_>,
    target: &Endpoint<'_>,
) -> ConnectionValidationResult {
    let Some(source_port) = source.port(PortDirection::Output) else {
        return ConnectionValidationResult::rejected(missing_port(source, PortDirection::Output));
    };
    let Some(target_port) = target.port(PortDirection::Input) else {
        return ConnectionValidationResult::rejected(missing_port(target, PortDirection::Input));
    };

    if source.block_id == target.block_id {
        return ConnectionValidationResult::rejected(
            Issue::error(
                Stage::Connections,
                codes::SELF_LOOP,
                format!("Block '{}' cannot connect to itself", source.block_id),
            )
            .on_block(source.block_id),
        );
    }

    let compatibility = table.grade(&source_port.kinds, &target_port.kinds);
    if compatibility == Compatibility::Incompatible {
        return ConnectionValidationResult::rejected(
            Issue::error(
                Stage::Connections,
                codes::PORT_TYPE_MISMATCH,
                format!(
                    "Cannot connect {} output '{}' to {} input '{}'",
                    source_port.kinds,
                    source_port.display_name(),
                    target_port.kinds,
                    target_port.display_name()
                ),
            )
            .on_block(target.block_id)
            .with_context(json!({
                "sourceType": source_port.kinds,
                "targetType": target_port.kinds,
            })),
        );
    }

    if let Some(limit) = port_limit(target_port, PortDirection::Input, options) {
        if target.load >= limit {
            return ConnectionValidationResult::rejected(over_limit(target, target_port, limit));
        }
    }
    if let Some(limit) = port_limit(source_port, PortDirection::Output, options) {
        if source.load >= limit {
            return ConnectionValidationResult::rejected(over_limit(source, source_port, limit));
        }
    }

    let warning = (compatibility == Compatibility::Conversion).then(|| {
        Issue::warning(
            Stage::Connections,
            codes::PORT_CONVERSION,
            format!(
                "{} output '{}' feeds {} input '{}' through a conversion",
                source_port.kinds,
                source_port.display_name(),
                target_port.kinds,
                target_port.display_name()
            ),
        )
        .on_block(target.block_id)
    });

    ConnectionValidationResult {
        valid: true,
        error: None,
        warning,
        compatibility,
    }
}

// =============================================================================
// WHOLE-FLOW PASS
// =============================================================================

/// Every connection of a flow, split by outcome. Port load is counted in connection order, so
/// only the connections beyond a port's limit are rejected.
#[derive(Debug, Default)]
pub struct ConnectionPartition<'a> {
    pub valid: Vec<&'a Connection>,
    pub invalid: Vec<(&'a Connection, Issue)>,
    pub warnings: Vec<Issue>,
}

impl ConnectionPartition<'_> {
    /// Accepted connections ending on the given input port.
    pub fn inbound(&self, block_id: &str, port_id: &str) -> usize {
        self.valid
            .iter()
            .filter(|c| c.target_block_id == block_id && c.target_port_id == port_id)
            .count()
    }

    pub fn findings(&self) -> Findings {
        let mut findings = Findings::new();
        for (_, issue) in &self.invalid {
            findings.push(issue.clone());
        }
        for issue in &self.warnings {
            findings.push(issue.clone());
        }
        findings
    }
}

pub fn check_connections<'a>(
    resolved: &ResolvedFlow<'a>,
    table: &CompatibilityTable,
    options: &ValidatorOptions,
) -> ConnectionPartition<'a> {
    let mut partition = ConnectionPartition::default();
    let mut inbound: HashMap<(&'a str, &'a str), usize> = HashMap::new();
    let mut outbound: HashMap<(&'a str, &'a str), usize> = HashMap::new();
    let flow: &'a Flow = resolved.flow;

    for connection in &flow.connections {
        let source_key = (
            connection.source_block_id.as_str(),
            connection.source_port_id.as_str(),
        );
        let target_key = (
            connection.target_block_id.as_str(),
            connection.target_port_id.as_str(),
        );

        let Some(source_block) = resolved.block(source_key.0) else {
            partition.invalid.push((
                connection,
                Issue::error(
                    Stage::Connections,
                    codes::MISSING_SOURCE_BLOCK,
                    format!(
                        "Connection '{}' starts at missing block '{}'",
                        connection.id, source_key.0
                    ),
                )
                .on_connection(&connection.id),
            ));
            continue;
        };
        let Some(target_block) = resolved.block(target_key.0) else {
            partition.invalid.push((
                connection,
                Issue::error(
                    Stage::Connections,
                    codes::MISSING_TARGET_BLOCK,
                    format!(
                        "Connection '{}' ends at missing block '{}'",
                        connection.id, target_key.0
                    ),
                )
                .on_connection(&connection.id),
            ));
            continue;
        };

        let source = Endpoint {
            block_id: source_key.0,
            block_type: &source_block.block_type,
            schema: resolved.schema(source_block),
            port_id: source_key.1,
            load: outbound.get(&source_key).copied().unwrap_or(0),
        };
        let target = Endpoint {
            block_id: target_key.0,
            block_type: &target_block.block_type,
            schema: resolved.schema(target_block),
            port_id: target_key.1,
            load: inbound.get(&target_key).copied().unwrap_or(0),
        };

        let result =
            check_endpoints(table, options, &source, &target).on_connection(&connection.id);
        match result.error {
            Some(error) => partition.invalid.push((connection, error)),
            None => {
                *outbound.entry(source_key).or_default() += 1;
                *inbound.entry(target_key).or_default() += 1;
                partition.warnings.extend(result.warning);
                partition.valid.push(connection);
            }
        }
    }

    partition
}

// =============================================================================
// EXPORT CONSISTENCY
// =============================================================================

/// Connections whose endpoints no longer exist in the block list, and port-map entries on
/// blocks naming connections that no longer exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConsistency {
    pub consistent: bool,
    pub orphaned_connections: Vec<String>,
    pub missing_blocks: Vec<String>,
    /// `blockId/portId/connectionId` for each stale port-map entry.
    pub stale_port_references: Vec<String>,
}

pub fn check_export_consistency(flow: &Flow) -> ExportConsistency {
    let present: std::collections::HashSet<&str> =
        flow.blocks.iter().map(|b| b.id.as_str()).collect();
    let known: std::collections::HashSet<&str> =
        flow.connections.iter().map(|c| c.id.as_str()).collect();
    let mut orphaned_connections = Vec::new();
    let mut missing_blocks: IndexSet<&str> = IndexSet::new();

    for connection in &flow.connections {
        let mut orphaned = false;
        for id in [&connection.source_block_id, &connection.target_block_id] {
            if !present.contains(id.as_str()) {
                missing_blocks.insert(id);
                orphaned = true;
            }
        }
        if orphaned {
            orphaned_connections.push(connection.id.clone());
        }
    }

    let mut stale_port_references = Vec::new();
    for block in &flow.blocks {
        let ports = block.connections.inputs.iter().chain(&block.connections.outputs);
        for (port_id, ids) in ports {
            for id in ids.iter().filter(|id| !known.contains(id.as_str())) {
                stale_port_references.push(format!("{}/{}/{}", block.id, port_id, id));
            }
        }
    }

    ExportConsistency {
        consistent: orphaned_connections.is_empty() && stale_port_references.is_empty(),
        orphaned_connections,
        missing_blocks: missing_blocks.into_iter().map(String::from).collect(),
        stale_port_references,
    }
}
