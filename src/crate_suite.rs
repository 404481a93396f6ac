//! Per-crate cargo test suites.
//!
//! Each workspace crate is exercised under three profiles: standard tests,
//! optimized tests, and documentation build. The results are opaque to the
//! classification pipeline; they are bundled into the batch report next to
//! the single-file results.

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::errors::HarnessError;

/// Outcome of one profile run for one crate.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProfileResult {
    /// Captured stderr when the profile failed, `None` on success.
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ProfileResult {
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// All three profile outcomes for one crate.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CrateTest {
    pub name: String,
    pub debug: ProfileResult,
    pub release: ProfileResult,
    pub doc: ProfileResult,
}

impl CrateTest {
    pub fn has_error(&self) -> bool {
        self.debug.has_error() || self.release.has_error() || self.doc.has_error()
    }
}

/// Runs the three profiles for every crate directory under `dir`, in name
/// order, printing a per-crate line and a final tally.
pub fn run_all(dir: &Path) -> Result<Vec<CrateTest>, HarnessError> {
    let mut names = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| {
        HarnessError::io(format!("failed to read crates dir `{}`", dir.display()), e)
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| {
            HarnessError::io(format!("failed to read crates dir `{}`", dir.display()), e)
        })?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();

    let mut result = Vec::with_capacity(names.len());
    let mut pass = 0;
    let mut fail = 0;

    for name in names {
        println!("testing crates/{name}");
        let crate_result = run_crate(&name, &dir.join(&name))?;
        if crate_result.has_error() {
            fail += 1;
        } else {
            pass += 1;
        }
        result.push(crate_result);
    }

    println!("--------------------------");
    println!("pass: {pass}, fail: {fail}");
    Ok(result)
}

fn run_crate(name: &str, path: &Path) -> Result<CrateTest, HarnessError> {
    // A stale target dir can mask failures between profiles.
    cargo_clean(path)?;
    let debug = run_profile(path, &["test"])?;
    cargo_clean(path)?;
    let release = run_profile(path, &["test", "--release"])?;
    cargo_clean(path)?;
    let doc = run_profile(path, &["doc"])?;
    cargo_clean(path)?;

    Ok(CrateTest {
        name: name.to_string(),
        debug,
        release,
        doc,
    })
}

fn run_profile(path: &Path, args: &[&str]) -> Result<ProfileResult, HarnessError> {
    let started_at = Instant::now();
    let output = Command::new("cargo")
        .args(args)
        .current_dir(path)
        .output()
        .map_err(|e| HarnessError::io(format!("failed to run `cargo {}`", args.join(" ")), e))?;
    let elapsed_ms = started_at.elapsed().as_millis() as u64;

    let error = if output.status.success() {
        None
    } else {
        Some(String::from_utf8_lossy(&output.stderr).to_string())
    };
    Ok(ProfileResult { error, elapsed_ms })
}

fn cargo_clean(path: &Path) -> Result<(), HarnessError> {
    let output = Command::new("cargo")
        .arg("clean")
        .current_dir(path)
        .output()
        .map_err(|e| HarnessError::io("failed to run `cargo clean`", e))?;
    if !output.status.success() {
        return Err(HarnessError::BuildFailed {
            status: output.status,
        });
    }
    Ok(())
}
