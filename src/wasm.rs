//! WASM entry points for browser use.
//!
//! Every entry takes JSON strings and returns a plain JS object tagged by `status`:
//! `{"status": "ok", "result": ...}` or `{"status": "failed", "message": ...}`. A `failed`
//! status means validation could not run, never that the flow has problems.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::EngineError;
use crate::flow::{self, Block};
use crate::options::ValidatorOptions;
use crate::schema::SchemaCatalog;
use crate::validate::{self, FlowValidator};

/// Validate a flow JSON against a block catalog JSON.
/// `options_json` may be empty to use the defaults.
#[wasm_bindgen]
pub fn validate_flow(flow_json: &str, catalog_json: &str, options_json: &str) -> JsValue {
    to_js(&Outcome::from(validate_flow_inner(
        flow_json,
        catalog_json,
        options_json,
    )))
}

fn validate_flow_inner(
    flow_json: &str,
    catalog_json: &str,
    options_json: &str,
) -> Result<crate::report::ValidationReport, EngineError> {
    let flow = flow::parse(flow_json)?;
    let validator = validator(catalog_json, options_json)?;
    validator.validate_flow(&flow)
}

/// Live check for a connection being dragged between two block instances.
#[wasm_bindgen]
pub fn validate_connection(
    source_block_json: &str,
    source_port: &str,
    target_block_json: &str,
    target_port: &str,
    catalog_json: &str,
) -> JsValue {
    let result = (|| {
        let source: Block =
            serde_json::from_str(source_block_json).map_err(EngineError::InvalidSnapshot)?;
        let target: Block =
            serde_json::from_str(target_block_json).map_err(EngineError::InvalidSnapshot)?;
        validator(catalog_json, "")?.validate_connection(&source, source_port, &target, target_port)
    })();
    to_js(&Outcome::from(result))
}

/// List connections whose endpoints are missing from the block list.
#[wasm_bindgen]
pub fn check_export_consistency(flow_json: &str) -> JsValue {
    let result = flow::parse(flow_json).map(|f| validate::check_export_consistency(&f));
    to_js(&Outcome::from(result))
}

fn validator(
    catalog_json: &str,
    options_json: &str,
) -> Result<FlowValidator<SchemaCatalog>, EngineError> {
    let catalog = SchemaCatalog::from_json(catalog_json)?;
    let options = if options_json.trim().is_empty() {
        ValidatorOptions::default()
    } else {
        ValidatorOptions::from_json(options_json)?
    };
    Ok(FlowValidator::new(catalog).with_options(options))
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    // Plain objects rather than JS `Map`s for the editor.
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(tag = "status")]
enum Outcome<T> {
    #[serde(rename = "ok")]
    Ok { result: T },
    #[serde(rename = "failed")]
    Failed { message: String },
}

impl<T> From<Result<T, EngineError>> for Outcome<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(result) => Outcome::Ok { result },
            Err(e) => Outcome::Failed {
                message: e.to_string(),
            },
        }
    }
}
