//! Harness-level failure modes.
//!
//! Only conditions that abort an entire run live here. Outcomes of the
//! compiler under test (compile errors, failed expectations, timeouts) are
//! data: they are recorded into result records and never raised as errors.

use miette::Diagnostic;
use thiserror::Error;

/// Fatal failures of the harness itself.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    /// The corpus directory exists but holds no test files at all.
    #[error("no test files found under `{root}`")]
    #[diagnostic(code(harness::corpus::empty))]
    EmptyCorpus { root: String },

    /// A filter was given and nothing matched it.
    #[error("no test file matches `{filter}`")]
    #[diagnostic(
        code(harness::corpus::unmatched),
        help("filters match by substring; anchor with `^` or `$` for prefix/suffix matches")
    )]
    FilterUnmatched { filter: String },

    /// Building the compiler under test failed. Nothing can be tested.
    #[error("`cargo build` failed ({status})")]
    #[diagnostic(code(harness::build))]
    BuildFailed { status: std::process::ExitStatus },

    /// The compiler's project-scaffold command failed, leaving the scratch
    /// directory in an unknown state.
    #[error("project scaffold failed: {detail}")]
    #[diagnostic(code(harness::scaffold))]
    ScaffoldFailed { detail: String },

    #[error("{context}: {source}")]
    #[diagnostic(code(harness::io))]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    /// Attaches a human-readable context string to an I/O failure.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        HarnessError::Io {
            context: context.into(),
            source,
        }
    }
}
