//! Drives the six end-to-end scenarios against the full
//! lex -> parse -> analyze pipeline, plus a couple of the universal
//! invariants that don't need a dedicated fixture per property.

use vex_diagnostics::{error_codes, Confidence, ErrorLevel};
use vex_semantic::{AnalyzerConfig, SemanticAnalyzer};

fn analyze(source: &str) -> (bool, SemanticAnalyzer) {
    let mut parser = vex_parser::Parser::new(source).expect("lexer accepts fixture source");
    let program = parser.parse_file().expect("parser accepts fixture source");
    let mut analyzer = SemanticAnalyzer::new(AnalyzerConfig::default());
    let ok = analyzer.analyze_program(&program);
    (ok, analyzer)
}

fn errors(analyzer: &SemanticAnalyzer) -> Vec<&vex_diagnostics::Diagnostic> {
    analyzer
        .engine
        .diagnostics()
        .iter()
        .filter(|d| d.level == ErrorLevel::Error)
        .collect()
}

#[test]
fn s1_undefined_identifier_with_suggestion() {
    let (ok, analyzer) = analyze("fn f(x: i32) -> i32 { return xx; }");
    assert!(!ok);

    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    let diag = errs[0];
    assert_eq!(diag.code, error_codes::UNDEFINED_VARIABLE);
    assert_eq!(diag.suggestions.len(), 1);
    let suggestion = &diag.suggestions[0];
    assert_eq!(suggestion.replacement, "x");
    assert_eq!(suggestion.confidence, Confidence::High);
}

#[test]
fn s2_numeric_mismatch_does_not_invalidate_the_earlier_let() {
    let (ok, analyzer) = analyze(r#"fn f() -> i32 { let s: string = "a"; return s; }"#);
    assert!(!ok);

    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("string"));
    assert!(errs[0].message.contains("i32"));
}

#[test]
fn s3_array_size_constant_success() {
    let (ok, analyzer) = analyze("const N: i32 = 3; fn f() { let a = [0; N]; }");
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn s3_array_size_must_be_positive() {
    let (ok, analyzer) = analyze("const N: i32 = 0; fn f() { let a = [0; N]; }");
    assert!(!ok);
    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("positive"));
}

#[test]
fn s3_array_size_must_be_a_compile_time_constant() {
    let (ok, analyzer) = analyze("fn f(n: i32) { let a = [0; n]; }");
    assert!(!ok);
    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("compile-time constant"));
}

#[test]
fn s4_await_on_non_handle() {
    let (ok, analyzer) = analyze("fn f() { let x: i32 = 1; await x; }");
    assert!(!ok);
    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("TaskHandle"));
}

#[test]
fn s5_generic_inference_for_result_ok() {
    let (ok, analyzer) = analyze("fn f() -> Result<i32, string> { return Result.Ok(1); }");
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn s6_unsafe_required_for_raw_pointer_deref() {
    let (ok, analyzer) = analyze("fn f(p: *i32) -> i32 { return *p; }");
    assert!(!ok);
    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].code, error_codes::UNSAFE_OPERATION);
}

#[test]
fn s6_unsafe_block_permits_raw_pointer_deref() {
    let (ok, analyzer) = analyze("fn f(p: *i32) -> i32 { unsafe { return *p; } }");
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn symbol_shadowing_restores_the_outer_binding() {
    let (ok, analyzer) = analyze(
        r#"
        fn f() -> i32 {
            let x: i32 = 1;
            if true {
                let x: string = "inner";
            }
            return x;
        }
        "#,
    );
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn numeric_widening_let_binding_allows_safe_upcast() {
    let (ok, analyzer) = analyze("fn f() { let a: i32 = 5; let b: i64 = a; }");
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn numeric_widening_narrowing_direction_is_rejected() {
    let (ok, analyzer) = analyze("fn f() { let a: i64 = 5; let b: i32 = a; }");
    assert!(!ok);
    let errs = errors(&analyzer);
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].code, error_codes::TYPE_MISMATCH);
}

#[test]
fn numeric_promotion_in_binary_op_is_independent_of_operand_order() {
    let (ok, analyzer) = analyze("fn f(a: i64, b: i32) -> i64 { return a + b; }");
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn range_index_into_an_array_produces_a_slice() {
    let (ok, analyzer) = analyze("fn f() { let a: [i32; 3] = [1, 2, 3]; let s = a[0..2]; }");
    assert!(ok, "{:?}", analyzer.engine.diagnostics());
    assert!(!analyzer.engine.has_errors());
}

#[test]
fn analysis_is_deterministic_across_runs() {
    let source = "fn f(x: i32) -> i32 { return xx + yy; }";
    let (_, first) = analyze(source);
    let (_, second) = analyze(source);

    let first_codes: Vec<&str> = first.engine.diagnostics().iter().map(|d| d.code.as_str()).collect();
    let second_codes: Vec<&str> = second.engine.diagnostics().iter().map(|d| d.code.as_str()).collect();
    assert_eq!(first_codes, second_codes);
}
