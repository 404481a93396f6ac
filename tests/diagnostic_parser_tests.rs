//! Tests for the stderr diagnostic stream parser.

use vesper_harness::diagnostics::{parse_diagnostics, Severity, StreamDefect};

#[test]
fn parses_the_canonical_two_error_stream() {
    let stderr = "error (e-0001): type mismatch\n  expected Int\nerror (e-0002): unused variable\nFinished: 2 errors and 0 warnings";
    let (errors, warnings) = parse_diagnostics(stderr).unwrap();

    assert_eq!(errors.len(), 2);
    assert!(warnings.is_empty());

    assert_eq!(errors[0].severity, Severity::Error);
    assert_eq!(errors[0].code, 1);
    assert_eq!(errors[0].title, "type mismatch");
    assert_eq!(errors[0].body, "  expected Int");

    assert_eq!(errors[1].code, 2);
    assert_eq!(errors[1].title, "unused variable");
    assert_eq!(errors[1].body, "");
}

#[test]
fn empty_stderr_yields_zero_diagnostics() {
    let (errors, warnings) = parse_diagnostics("").unwrap();
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn bodies_round_trip_their_continuation_lines() {
    let continuation = ["  line one", "", "    line three"];
    let stderr = format!(
        "error (e-0100): something\n{}\nFinished: 1 error and 0 warnings",
        continuation.join("\n"),
    );
    let (errors, _) = parse_diagnostics(&stderr).unwrap();
    assert_eq!(errors[0].body, continuation.join("\n"));
}

#[test]
fn warnings_and_errors_interleave_in_order() {
    let stderr = "warning (w-0007): shadowed name\nerror (e-0412): type mismatch\n  details\nwarning (w-0008): unused import\nFinished: 1 error and 2 warnings";
    let (errors, warnings) = parse_diagnostics(stderr).unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, 412);
    assert_eq!(errors[0].body, "  details");

    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0].code, 7);
    assert_eq!(warnings[1].code, 8);
}

#[test]
fn singular_terminator_forms_are_accepted() {
    let stderr = "error (e-0001): oops\nFinished: 1 error and 0 warnings in 152ms";
    let (errors, warnings) = parse_diagnostics(stderr).unwrap();
    assert_eq!(errors.len(), 1);
    assert!(warnings.is_empty());
}

#[test]
fn lines_after_the_terminator_are_ignored() {
    let stderr = "Finished: 0 errors and 0 warnings\nerror (e-9999): phantom\nFinished: 1 error and 0 warnings";
    let (errors, warnings) = parse_diagnostics(stderr).unwrap();
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn count_mismatch_is_a_distinct_defect() {
    let stderr = "error (e-0001): only one\nFinished: 2 errors and 0 warnings";
    let defect = parse_diagnostics(stderr).unwrap_err();
    assert_eq!(
        defect,
        StreamDefect::CountMismatch {
            declared_errors: 2,
            declared_warnings: 0,
            parsed_errors: 1,
            parsed_warnings: 0,
        }
    );
}

#[test]
fn missing_terminator_with_diagnostics_is_a_defect() {
    let stderr = "error (e-0001): dangling\n  body line";
    let defect = parse_diagnostics(stderr).unwrap_err();
    assert_eq!(defect, StreamDefect::MissingTerminator { parsed: 1 });
}

#[test]
fn leading_noise_outside_any_diagnostic_is_skipped() {
    let stderr = "compiling project...\nerror (e-0001): oops\nFinished: 1 error and 0 warnings";
    let (errors, _) = parse_diagnostics(stderr).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].body, "");
}

#[test]
fn parsing_is_idempotent() {
    let stderr = "error (e-0001): oops\n  detail\nFinished: 1 error and 0 warnings";
    let first = parse_diagnostics(stderr).unwrap();
    let second = parse_diagnostics(stderr).unwrap();
    assert_eq!(first, second);
}
