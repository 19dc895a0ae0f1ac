use flowcheck::flow::{self, Block, Flow};
use flowcheck::report::{Issue, ValidationReport};
use flowcheck::schema::SchemaCatalog;
use flowcheck::{FlowValidator, ValidatorOptions};

// =============================================================================
// Catalog + validator builders
// =============================================================================

/// The block catalog shared by every integration test.
pub fn catalog() -> SchemaCatalog {
    SchemaCatalog::from_json(include_str!("../fixtures/catalog.json")).expect("catalog fixture")
}

pub fn validator() -> FlowValidator<SchemaCatalog> {
    FlowValidator::new(catalog())
}

pub fn validator_with(options: ValidatorOptions) -> FlowValidator<SchemaCatalog> {
    FlowValidator::new(catalog()).with_options(options)
}

pub fn parse(json: &str) -> Flow {
    flow::parse(json).expect("flow fixture should parse")
}

/// Validate with the default catalog and options.
pub fn validate(flow: &Flow) -> ValidationReport {
    validator().validate_flow(flow).expect("validation should run")
}

// =============================================================================
// Flow builders
// =============================================================================

/// `s` (start) wired straight to `e` (end).
pub fn start_end() -> Flow {
    Flow::new()
        .with_block(Block::new("s", "start"))
        .with_block(Block::new("e", "end"))
        .connect("c1", ("s", "o1"), ("e", "i1"))
}

/// `s -> mid -> e`, where `mid` is a block of the given type with `flowIn`/`flowOut` ports.
pub fn through(mid: Block) -> Flow {
    let id = mid.id.clone();
    Flow::new()
        .with_block(Block::new("s", "start"))
        .with_block(mid)
        .with_block(Block::new("e", "end"))
        .connect("c1", ("s", "o1"), (id.as_str(), "flowIn"))
        .connect("c2", (id.as_str(), "flowOut"), ("e", "i1"))
}

// =============================================================================
// Assertions
// =============================================================================

pub fn error_codes(report: &ValidationReport) -> Vec<&'static str> {
    report.errors.iter().map(|e| e.code).collect()
}

pub fn warning_codes(report: &ValidationReport) -> Vec<&'static str> {
    report.warnings.iter().map(|w| w.code).collect()
}

pub fn assert_has_error<'a>(report: &'a ValidationReport, code: &str) -> &'a Issue {
    report
        .errors_with_code(code)
        .next()
        .unwrap_or_else(|| panic!("expected error {}, got: {:#?}", code, report.errors))
}

pub fn assert_has_warning<'a>(report: &'a ValidationReport, code: &str) -> &'a Issue {
    report
        .warnings_with_code(code)
        .next()
        .unwrap_or_else(|| panic!("expected warning {}, got: {:#?}", code, report.warnings))
}

pub fn assert_clean(report: &ValidationReport) {
    assert!(
        report.is_valid && report.errors.is_empty() && report.warnings.is_empty(),
        "expected a clean report, got errors {:#?} warnings {:#?}",
        report.errors,
        report.warnings
    );
}
