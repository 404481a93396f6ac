//! Classification of compiler invocations.
//!
//! The compiler under test signals its outcome through its exit code: 0 for
//! a clean run, 10 when the embedded tests failed at runtime, 11 when it
//! rejected the input. Everything else means the compiler itself
//! misbehaved.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// Classified outcome of one compiler invocation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Success,
    /// The input compiled, but its embedded tests failed at runtime.
    TestError,
    /// The compiler rejected the input.
    CompileError,
    /// Any other non-zero exit, or death by signal: a compiler bug.
    MiscError,
    /// The invocation exceeded its wall-clock deadline.
    Timeout,
}

impl RunStatus {
    /// Maps an exit code to a status. `None` means the process died to a
    /// signal, which is never part of the compiler's exit protocol.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => RunStatus::Success,
            Some(10) => RunStatus::TestError,
            Some(11) => RunStatus::CompileError,
            _ => RunStatus::MiscError,
        }
    }

    /// True when the diagnostic stream on stderr is guaranteed well-formed
    /// enough to parse. A misbehaving or killed compiler guarantees nothing.
    pub fn has_parseable_output(self) -> bool {
        !matches!(self, RunStatus::MiscError | RunStatus::Timeout)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::TestError => "test-error",
            RunStatus::CompileError => "compile-error",
            RunStatus::MiscError => "misc-error",
            RunStatus::Timeout => "timeout",
        }
    }

    /// Inverse of [`as_str`](Self::as_str), used by the expectation language.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "success" => Some(RunStatus::Success),
            "test-error" => Some(RunStatus::TestError),
            "compile-error" => Some(RunStatus::CompileError),
            "misc-error" => Some(RunStatus::MiscError),
            "timeout" => Some(RunStatus::Timeout),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One invocation's full classified result. Built once, never mutated;
/// aggregation only ever reads it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl RunResult {
    /// A result with no diagnostics attached, for statuses whose output is
    /// never parsed.
    pub fn with_status(status: RunStatus) -> Self {
        RunResult {
            status,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
