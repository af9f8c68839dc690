use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use vex_diagnostics::{Confidence, Diagnostic, DiagnosticEngine, DiagnosticMetadata, Span};

#[test]
fn test_diagnostics_json_against_schema() {
    let mut engine = DiagnosticEngine::new();

    let span = Span::new("main.vx".to_string(), 2, 5, 3);
    let suggestion_span = span.clone();
    let related_span = Span::new("lib.vx".to_string(), 4, 2, 4);

    let diag = Diagnostic::error(
        "E0425",
        "cannot find value `foo` in this scope".to_string(),
        span.clone(),
    )
    .with_help("did you mean `foo_bar`?".to_string())
    .with_extra_span(related_span, Some("declared here".to_string()))
    .with_suggestion_confidence(
        "rename to foo_bar".to_string(),
        "foo_bar".to_string(),
        suggestion_span,
        Confidence::High,
        Some("jaro-winkler similarity above threshold".to_string()),
    )
    .with_metadata(DiagnosticMetadata {
        error_category: Some("name_resolution".to_string()),
        similar_symbols: vec!["foo_bar".to_string()],
        inferred_types: vec![],
        available_methods: vec![],
    });

    engine.emit(diag);

    let json = engine.to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    let schema_str =
        fs::read_to_string("schemas/diagnostic.schema.json").expect("schema exists");
    let schema_json: Value = serde_json::from_str(&schema_str).expect("valid schema");
    let compiled = JSONSchema::compile(&schema_json).expect("valid schema compiles");

    if let Err(errors) = compiled.validate(&v) {
        for err in errors {
            panic!("schema validation error: {err}");
        }
    }
}

#[test]
fn test_capped_engine_reports_capped_true() {
    let mut engine = DiagnosticEngine::with_cap(2);
    for i in 0..5 {
        engine.emit(Diagnostic::error(
            "E0425",
            format!("error {i}"),
            Span::unknown(),
        ));
    }
    assert!(engine.is_capped());
    assert_eq!(engine.diagnostics().len(), 2);

    let v: Value = serde_json::from_str(&engine.to_json()).expect("valid json");
    assert_eq!(v["capped"], true);
}
