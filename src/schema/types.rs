//! Block-type schema model.
//!
//! These types are the serde target for the block catalog JSON the editor ships with.
//! Schemas are read-only once loaded; the validator never builds or mutates one.

use serde::{Deserialize, Serialize};

// =============================================================================
// PORTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortKind {
    FlowIn,
    FlowOut,
    SetVarNameIn,
    SetVarNameOut,
    SetVarDataIn,
    SetVarDataOut,
    OnErrorIn,
    OnErrorOut,
    LoopOut,
    /// Any kind string this build does not know. Never compatible with anything.
    #[serde(other)]
    Unknown,
}

/// Kinds that travel together across one connection (an output kind and its input kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFamily {
    Flow,
    VarName,
    VarData,
    Error,
    Loop,
    Unknown,
}

impl PortKind {
    pub const ALL: [PortKind; 9] = [
        PortKind::FlowIn,
        PortKind::FlowOut,
        PortKind::SetVarNameIn,
        PortKind::SetVarNameOut,
        PortKind::SetVarDataIn,
        PortKind::SetVarDataOut,
        PortKind::OnErrorIn,
        PortKind::OnErrorOut,
        PortKind::LoopOut,
    ];

    pub fn family(self) -> KindFamily {
        match self {
            PortKind::FlowIn | PortKind::FlowOut => KindFamily::Flow,
            PortKind::SetVarNameIn | PortKind::SetVarNameOut => KindFamily::VarName,
            PortKind::SetVarDataIn | PortKind::SetVarDataOut => KindFamily::VarData,
            PortKind::OnErrorIn | PortKind::OnErrorOut => KindFamily::Error,
            PortKind::LoopOut => KindFamily::Loop,
            PortKind::Unknown => KindFamily::Unknown,
        }
    }

    /// Control-flow sequencing kinds.
    pub fn is_execution(self) -> bool {
        matches!(self, PortKind::FlowIn | PortKind::FlowOut)
    }

    /// Kinds carrying a variable name or a variable value.
    pub fn is_variable(self) -> bool {
        matches!(self.family(), KindFamily::VarName | KindFamily::VarData)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortKind::FlowIn => "flowIn",
            PortKind::FlowOut => "flowOut",
            PortKind::SetVarNameIn => "setVarNameIn",
            PortKind::SetVarNameOut => "setVarNameOut",
            PortKind::SetVarDataIn => "setVarDataIn",
            PortKind::SetVarDataOut => "setVarDataOut",
            PortKind::OnErrorIn => "onErrorIn",
            PortKind::OnErrorOut => "onErrorOut",
            PortKind::LoopOut => "loopOut",
            PortKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum KindsRepr {
    One(PortKind),
    Many(Vec<PortKind>),
}

/// One or more accepted kinds. The first kind is the port's primary kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KindsRepr", into = "KindsRepr")]
pub struct PortKinds(Vec<PortKind>);

impl From<KindsRepr> for PortKinds {
    fn from(repr: KindsRepr) -> Self {
        match repr {
            KindsRepr::One(kind) => PortKinds(vec![kind]),
            KindsRepr::Many(kinds) => PortKinds(kinds),
        }
    }
}

impl From<PortKinds> for KindsRepr {
    fn from(kinds: PortKinds) -> Self {
        match kinds.0.as_slice() {
            [single] => KindsRepr::One(*single),
            _ => KindsRepr::Many(kinds.0),
        }
    }
}

impl PortKinds {
    pub fn one(kind: PortKind) -> Self {
        PortKinds(vec![kind])
    }

    pub fn many(kinds: impl IntoIterator<Item = PortKind>) -> Self {
        PortKinds(kinds.into_iter().collect())
    }

    pub fn primary(&self) -> Option<PortKind> {
        self.0.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = PortKind> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, kind: PortKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn any(&self, f: impl Fn(PortKind) -> bool) -> bool {
        self.0.iter().any(|k| f(*k))
    }
}

impl std::fmt::Display for PortKinds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join(" | "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortDirection {
    Input,
    Output,
}

/// Per-port cardinality override. Ports without one use the validator's policy default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionLimit {
    Unbounded,
    AtMost(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kinds: PortKinds,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_connections: Option<ConnectionLimit>,
}

impl PortDef {
    pub fn new(id: impl Into<String>, kinds: PortKinds) -> Self {
        PortDef {
            id: id.into(),
            label: None,
            kinds,
            required: false,
            max_connections: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_limit(mut self, limit: ConnectionLimit) -> Self {
        self.max_connections = Some(limit);
        self
    }

    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    String,
    Number,
    /// Numeric time span; zero means "not configured".
    Duration,
    Boolean,
    Select,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "type", default = "ParamDef::default_kind")]
    pub kind: ParamKind,
    #[serde(default)]
    pub required: bool,
}

impl ParamDef {
    fn default_kind() -> ParamKind {
        ParamKind::Other
    }
}

// =============================================================================
// RULE BUNDLES
// =============================================================================

/// Where a parameter value may come from instead of being typed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AlternativeSource {
    /// An incoming connection exists on the named input port (`connection:<portId>`).
    Connection(String),
    /// A global variable is selected on the block (`globalVariable`).
    GlobalVariable,
}

impl TryFrom<String> for AlternativeSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "globalVariable" {
            return Ok(AlternativeSource::GlobalVariable);
        }
        match value.strip_prefix("connection:") {
            Some(port) if !port.is_empty() => Ok(AlternativeSource::Connection(port.to_string())),
            _ => Err(format!("unknown alternative source '{}'", value)),
        }
    }
}

impl From<AlternativeSource> for String {
    fn from(source: AlternativeSource) -> Self {
        match source {
            AlternativeSource::Connection(port) => format!("connection:{}", port),
            AlternativeSource::GlobalVariable => "globalVariable".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeRule {
    pub field: String,
    pub alternatives: Vec<AlternativeSource>,
}

/// `condition` is a textual test over other parameters,
/// e.g. `mode === 'timed' OR mode === 'pulse'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRequirement {
    pub condition: String,
    pub required_params: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterRules {
    pub required: Vec<String>,
    pub recommended: Vec<String>,
    pub required_with_alternatives: Vec<AlternativeRule>,
    pub conditional_required: Vec<ConditionalRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionRules {
    pub required_inputs: Vec<String>,
    pub required_outputs: Vec<String>,
    pub recommended_inputs: Vec<String>,
    pub recommended_outputs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRules {
    pub connections: Option<ConnectionRules>,
    pub parameters: Option<ParameterRules>,
}

// =============================================================================
// BLOCK SCHEMA
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockCategory {
    /// Entry sentinel of the execution chain.
    Start,
    /// Exit sentinel of the execution chain.
    End,
    Core,
    #[serde(alias = "support")]
    Auxiliary,
    #[serde(other)]
    Other,
}

impl BlockCategory {
    /// Start and end sentinels are core blocks with extra rules.
    pub fn is_core(self) -> bool {
        matches!(
            self,
            BlockCategory::Start | BlockCategory::End | BlockCategory::Core
        )
    }

    pub fn is_auxiliary(self) -> bool {
        self == BlockCategory::Auxiliary
    }
}

/// Which parameter names or references a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableRole {
    Defines(String),
    Consumes(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchema {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub category: BlockCategory,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub experimental: bool,
    #[serde(default)]
    pub variable: Option<VariableRole>,
    #[serde(default, rename = "validationRules")]
    pub rules: Option<ValidationRules>,
}

impl BlockSchema {
    pub fn new(id: impl Into<String>, category: BlockCategory) -> Self {
        BlockSchema {
            id: id.into(),
            name: None,
            category,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: Vec::new(),
            deprecated: false,
            experimental: false,
            variable: None,
            rules: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn input(&self, port_id: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.id == port_id)
    }

    pub fn output(&self, port_id: &str) -> Option<&PortDef> {
        self.outputs.iter().find(|p| p.id == port_id)
    }

    pub fn port(&self, direction: PortDirection, port_id: &str) -> Option<&PortDef> {
        match direction {
            PortDirection::Input => self.input(port_id),
            PortDirection::Output => self.output(port_id),
        }
    }

    pub fn has_execution_input(&self) -> bool {
        self.inputs.iter().any(|p| p.kinds.contains(PortKind::FlowIn))
    }

    pub fn has_execution_output(&self) -> bool {
        self.outputs.iter().any(|p| p.kinds.contains(PortKind::FlowOut))
    }

    /// Any declared port, on either side, that accepts an execution kind.
    pub fn exposes_execution_port(&self) -> bool {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .any(|p| p.kinds.any(PortKind::is_execution))
    }

    pub fn param(&self, param_id: &str) -> Option<&ParamDef> {
        self.parameters.iter().find(|p| p.id == param_id)
    }

    pub fn param_label<'a>(&'a self, param_id: &'a str) -> &'a str {
        self.param(param_id)
            .and_then(|p| p.label.as_deref())
            .unwrap_or(param_id)
    }

    pub fn connection_rules(&self) -> Option<&ConnectionRules> {
        self.rules.as_ref().and_then(|r| r.connections.as_ref())
    }

    pub fn parameter_rules(&self) -> Option<&ParameterRules> {
        self.rules.as_ref().and_then(|r| r.parameters.as_ref())
    }
}
