//! Parsing of the compiler's stderr diagnostic stream.
//!
//! The stream is line-oriented. Three productions matter:
//!
//! ```text
//! error (e-0412): type mismatch          <- opens an error diagnostic
//! warning (w-0007): unused variable      <- opens a warning diagnostic
//! Finished: 2 errors and 1 warning       <- terminator; declares counts
//! ```
//!
//! Any other line while a diagnostic is open is a continuation and joins
//! that diagnostic's body. The terminator's counts are authoritative: if the
//! parsed diagnostics disagree with them, the compiler's own reporting is
//! broken, and that is surfaced as a [`StreamDefect`] rather than a normal
//! test outcome.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a single compiler diagnostic.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }

    /// The code prefix the compiler prints for this severity (`e` or `w`).
    pub fn code_prefix(self) -> char {
        match self {
            Severity::Error => 'e',
            Severity::Warning => 'w',
        }
    }
}

/// A single structured diagnostic emitted by the compiler under test.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// The 4-digit numeric code from the header line.
    pub code: u16,
    /// The header's text after the colon.
    pub title: String,
    /// Everything between this header and the next header or terminator,
    /// newline-joined, exactly as the compiler printed it.
    pub body: String,
}

impl Diagnostic {
    /// Renders the code the way the compiler prints it, e.g. `e-0412`.
    pub fn display_code(&self) -> String {
        format!("{}-{:04}", self.severity.code_prefix(), self.code)
    }
}

/// A malformed diagnostic stream: the compiler broke its own reporting
/// contract. This is a harness-detected compiler defect, deliberately kept
/// distinct from every normal test outcome.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum StreamDefect {
    #[error(
        "diagnostic count mismatch: terminator declared {declared_errors} error(s) and \
         {declared_warnings} warning(s), but {parsed_errors} and {parsed_warnings} were parsed"
    )]
    CountMismatch {
        declared_errors: usize,
        declared_warnings: usize,
        parsed_errors: usize,
        parsed_warnings: usize,
    },

    #[error("diagnostic stream holds {parsed} diagnostic(s) but no terminator line")]
    MissingTerminator { parsed: usize },
}

lazy_static! {
    static ref ERROR_HEADER: Regex = Regex::new(r"^error \(e-(\d{4})\): (.*)$").unwrap();
    static ref WARNING_HEADER: Regex = Regex::new(r"^warning \(w-(\d{4})\): (.*)$").unwrap();
    static ref TERMINATOR: Regex = Regex::new(r"^Finished: (\d+) errors? and (\d+) warnings?").unwrap();
}

/// A header has been seen; continuation lines are still accumulating.
struct OpenDiagnostic {
    severity: Severity,
    code: u16,
    title: String,
    body_lines: Vec<String>,
}

impl OpenDiagnostic {
    fn close(self) -> Diagnostic {
        Diagnostic {
            severity: self.severity,
            code: self.code,
            title: self.title,
            body: self.body_lines.join("\n"),
        }
    }
}

/// Parses the captured stderr of one invocation into ordered error and
/// warning diagnostics, validating the parsed counts against the terminator.
///
/// Empty input (no headers, no terminator) is well-formed and yields nothing.
/// Lines after the terminator are ignored.
pub fn parse_diagnostics(stderr: &str) -> Result<(Vec<Diagnostic>, Vec<Diagnostic>), StreamDefect> {
    let mut errors: Vec<Diagnostic> = Vec::new();
    let mut warnings: Vec<Diagnostic> = Vec::new();
    let mut open: Option<OpenDiagnostic> = None;
    let mut declared: Option<(usize, usize)> = None;

    for line in stderr.lines() {
        if let Some(caps) = ERROR_HEADER.captures(line) {
            commit(open.take(), &mut errors, &mut warnings);
            open = Some(open_header(Severity::Error, &caps));
        } else if let Some(caps) = WARNING_HEADER.captures(line) {
            commit(open.take(), &mut errors, &mut warnings);
            open = Some(open_header(Severity::Warning, &caps));
        } else if let Some(caps) = TERMINATOR.captures(line) {
            commit(open.take(), &mut errors, &mut warnings);
            declared = Some((count_capture(&caps, 1), count_capture(&caps, 2)));
            break;
        } else if let Some(diagnostic) = open.as_mut() {
            diagnostic.body_lines.push(line.to_string());
        }
    }
    commit(open.take(), &mut errors, &mut warnings);

    match declared {
        Some((declared_errors, declared_warnings)) => {
            if errors.len() != declared_errors || warnings.len() != declared_warnings {
                return Err(StreamDefect::CountMismatch {
                    declared_errors,
                    declared_warnings,
                    parsed_errors: errors.len(),
                    parsed_warnings: warnings.len(),
                });
            }
            Ok((errors, warnings))
        }
        None if errors.is_empty() && warnings.is_empty() => Ok((errors, warnings)),
        None => Err(StreamDefect::MissingTerminator {
            parsed: errors.len() + warnings.len(),
        }),
    }
}

fn open_header(severity: Severity, caps: &regex::Captures<'_>) -> OpenDiagnostic {
    OpenDiagnostic {
        severity,
        // The pattern admits exactly 4 digits, so this cannot overflow a u16.
        code: caps[1].parse().unwrap_or_default(),
        title: caps[2].to_string(),
        body_lines: Vec::new(),
    }
}

fn count_capture(caps: &regex::Captures<'_>, index: usize) -> usize {
    caps[index].parse().unwrap_or_default()
}

fn commit(open: Option<OpenDiagnostic>, errors: &mut Vec<Diagnostic>, warnings: &mut Vec<Diagnostic>) {
    if let Some(diagnostic) = open {
        match diagnostic.severity {
            Severity::Error => errors.push(diagnostic.close()),
            Severity::Warning => warnings.push(diagnostic.close()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_code_pads_to_four_digits() {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            code: 7,
            title: String::new(),
            body: String::new(),
        };
        assert_eq!(diagnostic.display_code(), "w-0007");
    }

    #[test]
    fn header_patterns_reject_malformed_codes() {
        // 5-digit codes and missing spaces are continuations, not headers.
        assert!(!ERROR_HEADER.is_match("error (e-12345): too long"));
        assert!(!ERROR_HEADER.is_match("error(e-1234): no space"));
        assert!(ERROR_HEADER.is_match("error (e-1234): ok"));
    }
}
