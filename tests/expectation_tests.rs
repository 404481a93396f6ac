//! Tests for expectation extraction and the assertion language.

use vesper_harness::diagnostics::{Diagnostic, Severity};
use vesper_harness::expect::{extract_block, Expectation};
use vesper_harness::run_result::{RunResult, RunStatus};

fn diagnostic(severity: Severity, code: u16, title: &str, body: &str) -> Diagnostic {
    Diagnostic {
        severity,
        code,
        title: title.to_string(),
        body: body.to_string(),
    }
}

fn compile_error_result() -> RunResult {
    RunResult {
        status: RunStatus::CompileError,
        errors: vec![
            diagnostic(Severity::Error, 412, "type mismatch", "  expected Int\n  found Str"),
            diagnostic(Severity::Error, 8, "unknown name", ""),
        ],
        warnings: vec![diagnostic(Severity::Warning, 7, "unused variable", "")],
    }
}

// =====================
// Block extraction
// =====================

#[test]
fn extracts_a_block_between_markers() {
    let source = "//# expect\n//# (status timeout)\n//# end\nlet main = 0;\n";
    assert_eq!(extract_block(source).as_deref(), Some(" (status timeout)"));
}

#[test]
fn markers_ignore_case_and_surrounding_whitespace() {
    let source = "let main = 0;\n  //#   Expect  \n//# (status success)\n\t//# END\n";
    assert_eq!(extract_block(source).as_deref(), Some(" (status success)"));
}

#[test]
fn lines_outside_the_block_do_not_contribute() {
    let source = "//# stray directive\n//# expect\n//# (status success)\n//# end\n//# trailing\n";
    assert_eq!(extract_block(source).as_deref(), Some(" (status success)"));
}

#[test]
fn no_block_means_none() {
    assert_eq!(extract_block("let main = 0;\n"), None);
}

// =====================
// Default expectation
// =====================

#[test]
fn default_expectation_passes_on_success() {
    let expectation = Expectation::default_success();
    let result = RunResult::with_status(RunStatus::Success);
    assert!(expectation.check(&result).is_ok());
}

#[test]
fn default_expectation_reports_the_actual_status() {
    let expectation = Expectation::default_success();
    let result = RunResult::with_status(RunStatus::TestError);
    let message = expectation.check(&result).unwrap_err();
    assert!(message.contains("test-error"), "got: {message}");
}

// =====================
// Assertion forms
// =====================

#[test]
fn status_assertion() {
    let expectation = Expectation::parse("(status compile-error)").unwrap();
    assert!(expectation.check(&compile_error_result()).is_ok());
    assert!(expectation
        .check(&RunResult::with_status(RunStatus::Success))
        .is_err());
}

#[test]
fn diagnostic_code_presence() {
    let result = compile_error_result();
    assert!(Expectation::parse("(error 412)").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(error 0412)").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(warning 7)").unwrap().check(&result).is_ok());

    let message = Expectation::parse("(error 9999)")
        .unwrap()
        .check(&result)
        .unwrap_err();
    assert!(message.contains("e-9999"), "got: {message}");
    assert!(message.contains("e-0412"), "got: {message}");
}

#[test]
fn count_comparisons() {
    let result = compile_error_result();
    assert!(Expectation::parse("(errors == 2)").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(errors >= 1)").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(warnings < 2)").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(warnings != 1)").unwrap().check(&result).is_err());
}

#[test]
fn title_and_body_patterns() {
    let result = compile_error_result();
    assert!(Expectation::parse("(title \"mismatch\")").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(body \"expected Int\")").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(title \"^type\")").unwrap().check(&result).is_ok());
    assert!(Expectation::parse("(body \"no such text\")").unwrap().check(&result).is_err());
}

#[test]
fn regex_escapes_survive_the_tokenizer() {
    let result = compile_error_result();
    let expectation = Expectation::parse(r#"(body "expected\s+Int")"#).unwrap();
    assert!(expectation.check(&result).is_ok());
}

#[test]
fn boolean_combinators() {
    let result = compile_error_result();
    let expectation =
        Expectation::parse("(and (status compile-error) (error 412) (warnings == 1))").unwrap();
    assert!(expectation.check(&result).is_ok());

    let expectation = Expectation::parse("(or (status timeout) (error 412))").unwrap();
    assert!(expectation.check(&result).is_ok());

    let expectation = Expectation::parse("(not (status success))").unwrap();
    assert!(expectation.check(&result).is_ok());

    let expectation = Expectation::parse("(or (status timeout) (status success))").unwrap();
    assert!(expectation.check(&result).is_err());
}

#[test]
fn consecutive_top_level_forms_are_an_implicit_and() {
    let result = compile_error_result();
    let expectation =
        Expectation::parse("(status compile-error)\n(errors == 2)\n(warning 7)").unwrap();
    assert!(expectation.check(&result).is_ok());

    let expectation = Expectation::parse("(status compile-error)\n(errors == 5)").unwrap();
    assert!(expectation.check(&result).is_err());
}

// =====================
// Failure isolation
// =====================

#[test]
fn syntax_errors_never_panic() {
    for block in [
        "",
        "(",
        "(status)",
        "(status nonsense)",
        "(error abc)",
        "(errors ~ 3)",
        "(frobnicate 1)",
        "(title unquoted)",
        "(and (status success)",
        "\"just a string\"",
    ] {
        assert!(Expectation::parse(block).is_err(), "accepted: {block:?}");
    }
}

#[test]
fn bad_regex_is_an_expectation_error_not_a_panic() {
    assert!(Expectation::parse("(title \"[unclosed\")").is_err());
}

#[test]
fn for_file_builds_default_or_parsed() {
    let with_block = "//# expect\n//# (status test-error)\n//# end\n";
    let expectation = Expectation::for_file(with_block).unwrap();
    assert!(expectation
        .check(&RunResult::with_status(RunStatus::TestError))
        .is_ok());

    let without_block = "let main = 0;\n";
    let expectation = Expectation::for_file(without_block).unwrap();
    assert!(expectation
        .check(&RunResult::with_status(RunStatus::Success))
        .is_ok());

    let broken_block = "//# expect\n//# (status bogus)\n//# end\n";
    assert!(Expectation::for_file(broken_block).is_err());
}
