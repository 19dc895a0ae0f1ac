//! Validation report model shared by every stage.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Stable issue codes. The editor keys UI hints off these strings.
pub mod codes {
    // Structure
    pub const NO_BLOCKS: &str = "NO_BLOCKS";
    pub const DUPLICATE_BLOCK_ID: &str = "DUPLICATE_BLOCK_ID";

    // Blocks
    pub const MISSING_BLOCK_DEFINITION: &str = "MISSING_BLOCK_DEFINITION";
    pub const DEPRECATED_BLOCK: &str = "DEPRECATED_BLOCK";
    pub const EXPERIMENTAL_BLOCK: &str = "EXPERIMENTAL_BLOCK";
    pub const MISSING_REQUIRED_INPUT: &str = "MISSING_REQUIRED_INPUT";
    pub const MISSING_REQUIRED_OUTPUT: &str = "MISSING_REQUIRED_OUTPUT";
    pub const MISSING_RECOMMENDED_INPUT: &str = "MISSING_RECOMMENDED_INPUT";
    pub const MISSING_RECOMMENDED_OUTPUT: &str = "MISSING_RECOMMENDED_OUTPUT";
    pub const REQUIRED_PORT_UNCONNECTED: &str = "REQUIRED_PORT_UNCONNECTED";

    // Parameters
    pub const MISSING_REQUIRED_PARAMETER: &str = "MISSING_REQUIRED_PARAMETER";
    pub const MISSING_RECOMMENDED_PARAMETER: &str = "MISSING_RECOMMENDED_PARAMETER";
    pub const MISSING_PARAMETER_OR_ALTERNATIVE: &str = "MISSING_PARAMETER_OR_ALTERNATIVE";
    pub const MISSING_CONDITIONAL_PARAMETER: &str = "MISSING_CONDITIONAL_PARAMETER";

    // Connections
    pub const MISSING_SOURCE_BLOCK: &str = "MISSING_SOURCE_BLOCK";
    pub const MISSING_TARGET_BLOCK: &str = "MISSING_TARGET_BLOCK";
    pub const MISSING_SOURCE_PORT: &str = "MISSING_SOURCE_PORT";
    pub const MISSING_TARGET_PORT: &str = "MISSING_TARGET_PORT";
    pub const SELF_LOOP: &str = "SELF_LOOP";
    pub const PORT_TYPE_MISMATCH: &str = "PORT_TYPE_MISMATCH";
    pub const TOO_MANY_CONNECTIONS: &str = "TOO_MANY_CONNECTIONS";
    pub const PORT_CONVERSION: &str = "PORT_CONVERSION";

    // Execution chain
    pub const MISSING_START_BLOCK: &str = "MISSING_START_BLOCK";
    pub const MULTIPLE_START_BLOCKS: &str = "MULTIPLE_START_BLOCKS";
    pub const MISSING_END_BLOCK: &str = "MISSING_END_BLOCK";
    pub const MULTIPLE_END_BLOCKS: &str = "MULTIPLE_END_BLOCKS";
    pub const BROKEN_FLOW_CHAIN: &str = "BROKEN_FLOW_CHAIN";
    pub const EXECUTION_CYCLE: &str = "EXECUTION_CYCLE";

    // Architecture
    pub const INVALID_BLOCK_TYPE: &str = "INVALID_BLOCK_TYPE";
    pub const AUXILIARY_BLOCK_IN_MAIN_FLOW: &str = "AUXILIARY_BLOCK_IN_MAIN_FLOW";
    pub const ISOLATED_AUXILIARY_BLOCK: &str = "ISOLATED_AUXILIARY_BLOCK";

    // Variables
    pub const UNDEFINED_VARIABLE: &str = "UNDEFINED_VARIABLE";
    pub const VARIABLE_NAME_DUPLICATE: &str = "VARIABLE_NAME_DUPLICATE";
    pub const UNUSED_VARIABLE: &str = "UNUSED_VARIABLE";
    pub const VARIABLE_CHAIN_BROKEN: &str = "VARIABLE_CHAIN_BROKEN";

    // Orphans
    pub const ORPHANED_BLOCK: &str = "ORPHANED_BLOCK";
    pub const END_UNREACHABLE: &str = "END_UNREACHABLE";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
}

/// The analysis that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Structure,
    Blocks,
    Connections,
    Chain,
    Architecture,
    Variables,
    Orphans,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Structure => write!(f, "Structure"),
            Stage::Blocks => write!(f, "Blocks"),
            Stage::Connections => write!(f, "Connections"),
            Stage::Chain => write!(f, "Chain"),
            Stage::Architecture => write!(f, "Architecture"),
            Stage::Variables => write!(f, "Variables"),
            Stage::Orphans => write!(f, "Orphans"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub code: &'static str,
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.stage, self.code, self.message)?;
        if let Some(id) = &self.block_id {
            write!(f, " (block '{}')", id)?;
        }
        if let Some(id) = &self.connection_id {
            write!(f, " (connection '{}')", id)?;
        }
        Ok(())
    }
}

impl Issue {
    pub fn error(stage: Stage, code: &'static str, message: impl Into<String>) -> Self {
        Issue {
            code,
            severity: Severity::Error,
            stage,
            message: message.into(),
            block_id: None,
            connection_id: None,
            context: None,
        }
    }

    pub fn warning(stage: Stage, code: &'static str, message: impl Into<String>) -> Self {
        Issue {
            severity: Severity::Warning,
            ..Issue::error(stage, code, message)
        }
    }

    pub fn on_block(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }

    pub fn on_connection(mut self, connection_id: impl Into<String>) -> Self {
        self.connection_id = Some(connection_id.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Errors and warnings produced by one analysis, in discovery order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route an issue into the list matching its severity.
    pub fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockStatus {
    Valid,
    Warning,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_blocks: usize,
    pub valid_blocks: usize,
    pub invalid_blocks: usize,
    pub total_connections: usize,
    pub valid_connections: usize,
    pub invalid_connections: usize,
    pub has_start_block: bool,
    pub has_end_reachable: bool,
    pub orphaned_blocks: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub block_results: IndexMap<String, BlockStatus>,
}

impl ValidationReport {
    pub fn errors_with_code(&self, code: &str) -> impl Iterator<Item = &Issue> {
        self.errors.iter().filter(move |e| e.code == code)
    }

    pub fn warnings_with_code(&self, code: &str) -> impl Iterator<Item = &Issue> {
        self.warnings.iter().filter(move |w| w.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_route_by_severity() {
        let mut findings = Findings::new();
        findings.push(Issue::error(Stage::Structure, codes::NO_BLOCKS, "empty"));
        findings.push(Issue::warning(Stage::Blocks, codes::DEPRECATED_BLOCK, "old"));
        assert_eq!(findings.errors.len(), 1);
        assert_eq!(findings.warnings.len(), 1);
        assert!(findings.has_errors());
    }

    #[test]
    fn issue_display_includes_attribution() {
        let issue = Issue::error(Stage::Connections, codes::SELF_LOOP, "loop")
            .on_block("b1")
            .on_connection("c1");
        assert_eq!(
            issue.to_string(),
            "[Connections:SELF_LOOP] loop (block 'b1') (connection 'c1')"
        );
    }
}
