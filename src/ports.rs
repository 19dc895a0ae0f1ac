//! Port compatibility table.
//!
//! Rules are one-directional: `flowOut -> flowIn` says nothing about `flowIn -> flowOut`.
//! Lookups go through a per-kind target set that is built on first use and dropped whenever
//! the rule list changes.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::schema::{PortKind, PortKinds};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityRule {
    pub source: PortKind,
    pub targets: Vec<PortKind>,
    /// Also register every `target -> source` pair.
    pub bidirectional: bool,
}

impl CompatibilityRule {
    pub fn new(source: PortKind, targets: impl IntoIterator<Item = PortKind>) -> Self {
        CompatibilityRule {
            source,
            targets: targets.into_iter().collect(),
            bidirectional: false,
        }
    }

    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }
}

/// How well a source kind fits a target port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Compatibility {
    /// Compatible and within the same kind family.
    Exact,
    /// Compatible, but across kind families. Legal, surfaced as a warning.
    Conversion,
    Incompatible,
}

#[derive(Debug, Default)]
pub struct CompatibilityTable {
    rules: Vec<CompatibilityRule>,
    matrix: OnceLock<HashMap<PortKind, HashSet<PortKind>>>,
}

impl Clone for CompatibilityTable {
    fn clone(&self) -> Self {
        CompatibilityTable::from_rules(self.rules.clone())
    }
}

impl CompatibilityTable {
    pub fn from_rules(rules: Vec<CompatibilityRule>) -> Self {
        CompatibilityTable {
            rules,
            matrix: OnceLock::new(),
        }
    }

    /// The editor's standard pairings.
    pub fn standard() -> Self {
        use PortKind::*;
        CompatibilityTable::from_rules(vec![
            CompatibilityRule::new(FlowOut, [FlowIn]),
            CompatibilityRule::new(LoopOut, [FlowIn]),
            CompatibilityRule::new(SetVarNameOut, [SetVarNameIn]),
            CompatibilityRule::new(SetVarDataOut, [SetVarDataIn]),
            CompatibilityRule::new(OnErrorOut, [OnErrorIn]),
        ])
    }

    pub fn rules(&self) -> &[CompatibilityRule] {
        &self.rules
    }

    pub fn add_rule(&mut self, rule: CompatibilityRule) {
        self.rules.push(rule);
        self.matrix = OnceLock::new();
    }

    /// Remove the first rule from `source` that lists `target`. Returns whether one was removed.
    pub fn remove_rule(&mut self, source: PortKind, target: PortKind) -> bool {
        let Some(index) = self
            .rules
            .iter()
            .position(|r| r.source == source && r.targets.contains(&target))
        else {
            return false;
        };
        self.rules.remove(index);
        self.matrix = OnceLock::new();
        true
    }

    fn matrix(&self) -> &HashMap<PortKind, HashSet<PortKind>> {
        self.matrix.get_or_init(|| {
            let mut matrix: HashMap<PortKind, HashSet<PortKind>> = HashMap::new();
            for rule in &self.rules {
                matrix
                    .entry(rule.source)
                    .or_default()
                    .extend(rule.targets.iter().copied());
                if rule.bidirectional {
                    for target in &rule.targets {
                        matrix.entry(*target).or_default().insert(rule.source);
                    }
                }
            }
            matrix
        })
    }

    pub fn is_compatible(&self, source: PortKind, target: PortKind) -> bool {
        if source == PortKind::Unknown || target == PortKind::Unknown {
            return false;
        }
        self.matrix()
            .get(&source)
            .is_some_and(|targets| targets.contains(&target))
    }

    /// Grade a source port against a (possibly composite) target port. The source is judged
    /// by its primary kind; the target matches if any of its kinds does.
    pub fn grade(&self, source: &PortKinds, target: &PortKinds) -> Compatibility {
        let Some(source_kind) = source.primary() else {
            return Compatibility::Incompatible;
        };
        let mut matched = target.iter().filter(|t| self.is_compatible(source_kind, *t));
        match matched.next() {
            None => Compatibility::Incompatible,
            Some(first) => {
                let same_family = std::iter::once(first)
                    .chain(matched)
                    .any(|t| t.family() == source_kind.family());
                if same_family {
                    Compatibility::Exact
                } else {
                    Compatibility::Conversion
                }
            }
        }
    }

    /// Target kinds the given source kind may feed, in `PortKind::ALL` order.
    pub fn compatible_targets(&self, source: PortKind) -> Vec<PortKind> {
        PortKind::ALL
            .into_iter()
            .filter(|t| self.is_compatible(source, *t))
            .collect()
    }

    /// Source kinds that may feed the given target kind, in `PortKind::ALL` order.
    pub fn compatible_sources(&self, target: PortKind) -> Vec<PortKind> {
        PortKind::ALL
            .into_iter()
            .filter(|s| self.is_compatible(*s, target))
            .collect()
    }
}
