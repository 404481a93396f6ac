//! Thin wrappers around the external build tools the harness drives.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::errors::HarnessError;

#[cfg(not(windows))]
pub const COMPILER_BIN: &str = "vesper";
#[cfg(windows)]
pub const COMPILER_BIN: &str = "vesper.exe";

/// Builds the compiler under test in its repository and returns the path to
/// the freshly built binary. A failed build is fatal: nothing can be tested
/// without the compiler.
pub fn build_compiler(root: &Path, features: &[String]) -> Result<PathBuf, HarnessError> {
    let mut command = Command::new("cargo");
    command.arg("build").current_dir(root);
    if !features.is_empty() {
        command.arg(format!("--features={}", features.join(",")));
    }

    let status = command
        .status()
        .map_err(|e| HarnessError::io("failed to run `cargo build`", e))?;
    if !status.success() {
        return Err(HarnessError::BuildFailed { status });
    }
    Ok(root.join("target").join("debug").join(COMPILER_BIN))
}

/// Pipes `cargo depgraph` into `dot -Tpng` and writes `dep_graph.png` at the
/// repository root.
pub fn render_depgraph(root: &Path) -> Result<PathBuf, HarnessError> {
    let mut depgraph = Command::new("cargo")
        .arg("depgraph")
        .current_dir(root)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| HarnessError::io("failed to run `cargo depgraph`", e))?;

    let depgraph_out = depgraph.stdout.take().ok_or_else(|| {
        HarnessError::io(
            "failed to run `cargo depgraph`",
            io::Error::new(io::ErrorKind::BrokenPipe, "no stdout pipe"),
        )
    })?;

    let dot = Command::new("dot")
        .arg("-Tpng")
        .stdin(Stdio::from(depgraph_out))
        .output()
        .map_err(|e| HarnessError::io("failed to run `dot -Tpng`", e))?;

    depgraph
        .wait()
        .map_err(|e| HarnessError::io("failed to wait for `cargo depgraph`", e))?;

    if !dot.status.success() {
        return Err(HarnessError::BuildFailed { status: dot.status });
    }

    let target = root.join("dep_graph.png");
    std::fs::write(&target, &dot.stdout)
        .map_err(|e| HarnessError::io(format!("failed to write `{}`", target.display()), e))?;
    Ok(target)
}
