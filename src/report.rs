//! Batch reports and their persistence.
//!
//! One report file per commit+platform pair: re-running on the same pair
//! overwrites, distinct pairs never collide. Reports are plain JSON so the
//! history stays diffable and tool-friendly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crate_suite::CrateTest;
use crate::diagnostics::Diagnostic;
use crate::errors::HarnessError;
use crate::meta::Meta;
use crate::run_result::RunStatus;

/// Everything recorded about one test file's run.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FileReport {
    pub name: String,
    pub status: RunStatus,
    /// The failure message; `None` means the expectation held.
    pub error: Option<String>,
    /// Captured output, plain rendering. `None` in pass-through mode.
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    /// Colored renderings, retained in archive mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_colored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr_colored: Option<String>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Content hash of the source that ran.
    pub hash: String,
    pub elapsed_ms: u64,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Success/fail tally for one test category.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub fail: usize,
    pub elapsed_ms: u64,
}

impl Summary {
    pub fn from_files(files: &[FileReport], elapsed_ms: u64) -> Self {
        let success = files.iter().filter(|f| f.passed()).count();
        Summary {
            total: files.len(),
            success,
            fail: files.len() - success,
            elapsed_ms,
        }
    }

    pub fn from_crates(crates: &[CrateTest], elapsed_ms: u64) -> Self {
        let success = crates.iter().filter(|c| !c.has_error()).count();
        Summary {
            total: crates.len(),
            success,
            fail: crates.len() - success,
            elapsed_ms,
        }
    }
}

/// The aggregated document for one full run.
#[derive(Debug, Deserialize, Serialize)]
pub struct BatchReport {
    pub meta: Meta,
    /// Single-file results, name-ordered. `None` when the suite did not run.
    pub files: Option<Vec<FileReport>>,
    /// Crate-level results, opaque to the classification pipeline.
    pub crates: Option<Vec<CrateTest>>,
    pub file_summary: Option<Summary>,
    pub crate_summary: Option<Summary>,
}

/// Derives the persisted file name: `result-<rev9><-dirty?>-<platform>.json`.
pub fn result_file_name(meta: &Meta) -> String {
    format!(
        "result-{}{}-{}.json",
        meta.revision_prefix(),
        if meta.is_repo_clean { "" } else { "-dirty" },
        meta.platform.as_str(),
    )
}

/// Writes the report under `results_dir`, creating the directory if needed,
/// and returns the path written.
pub fn persist(report: &BatchReport, results_dir: &Path) -> Result<PathBuf, HarnessError> {
    std::fs::create_dir_all(results_dir).map_err(|e| {
        HarnessError::io(
            format!("failed to create results dir `{}`", results_dir.display()),
            e,
        )
    })?;

    let path = results_dir.join(result_file_name(&report.meta));
    let json = serde_json::to_string_pretty(report).map_err(|e| {
        HarnessError::io("failed to serialize the batch report", e.into())
    })?;
    std::fs::write(&path, json)
        .map_err(|e| HarnessError::io(format!("failed to write `{}`", path.display()), e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Platform;

    fn meta(clean: bool) -> Meta {
        Meta {
            commit_hash: Some("fedcba9876543210fedcba9876543210fedcba98".to_string()),
            is_repo_clean: clean,
            cargo_version: String::new(),
            rustc_version: String::new(),
            platform: Platform::Linux,
            started_at_epoch_secs: 0,
        }
    }

    #[test]
    fn file_name_encodes_revision_and_platform() {
        assert_eq!(result_file_name(&meta(true)), "result-fedcba987-linux.json");
    }

    #[test]
    fn dirty_trees_are_marked() {
        assert_eq!(
            result_file_name(&meta(false)),
            "result-fedcba987-dirty-linux.json"
        );
    }
}
