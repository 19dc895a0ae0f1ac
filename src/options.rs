//! Validator configuration.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorOptions {
    /// Connection limit for input ports that do not declare one. `None` means unbounded.
    pub default_input_limit: Option<usize>,
    /// Report any cycle among execution edges as a warning, even when the chain is complete.
    pub report_execution_cycles: bool,
    /// Check declared `required` parameters on block types without a parameter rule bundle.
    pub fallback_parameter_checks: bool,
    /// Include per-block status in the report.
    pub include_block_results: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        ValidatorOptions {
            default_input_limit: Some(1),
            report_execution_cycles: false,
            fallback_parameter_checks: true,
            include_block_results: true,
        }
    }
}

impl ValidatorOptions {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(EngineError::InvalidOptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let options = ValidatorOptions::from_json(r#"{"reportExecutionCycles": true}"#).unwrap();
        assert!(options.report_execution_cycles);
        assert_eq!(options.default_input_limit, Some(1));
        assert!(options.fallback_parameter_checks);
    }

    #[test]
    fn null_input_limit_means_unbounded() {
        let options = ValidatorOptions::from_json(r#"{"defaultInputLimit": null}"#).unwrap();
        assert_eq!(options.default_input_limit, None);
    }
}
