//! Process driving: scratch project management and bounded invocation of
//! the compiler under test.
//!
//! Every invocation runs inside one shared scratch project that is deleted
//! and re-scaffolded first, so no run can see leftovers from the previous
//! one. The invocation itself carries a wall-clock deadline; past it the
//! child is killed and reaped, and the caller gets a timeout instead of
//! whatever partial output the child managed to write.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::errors::HarnessError;

/// How child output is handled for one invocation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaptureMode {
    /// Suppress color and capture, for deterministic text parsing.
    Parse,
    /// Preserve color; output is retained verbatim for later inspection.
    Archive,
    /// No capture: the child inherits the harness's stdio. For interactive
    /// debugging only.
    PassThrough,
}

/// Raw captured output of a finished child process. Empty in
/// [`CaptureMode::PassThrough`].
#[derive(Clone, Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("invocation exceeded its deadline")]
    Timeout,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Runs `binary args...` in `cwd`, killing the child once `timeout`
/// elapses.
///
/// Both pipes are drained on their own threads while the parent polls
/// `try_wait`, so a child that floods stderr can never fill a pipe and
/// deadlock against the poll loop. The poll backs off exponentially from
/// 1 ms to a 128 ms cap.
pub fn invoke(
    binary: &Path,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
    mode: CaptureMode,
) -> Result<ProcessOutput, InvokeError> {
    let mut command = Command::new(binary);
    command.args(args).current_dir(cwd);
    match mode {
        CaptureMode::PassThrough => {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        CaptureMode::Parse | CaptureMode::Archive => {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
    }

    let mut child = command.spawn()?;
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let mut backoff = Duration::from_millis(1);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            // The readers are not joined here: a killed child's grandchildren
            // may still hold the pipes open, and the partial output is
            // discarded anyway. The threads finish once the pipes close.
            return Err(InvokeError::Timeout);
        }
        thread::sleep(backoff);
        backoff = (backoff * 2).min(Duration::from_millis(128));
    };

    Ok(ProcessOutput {
        status,
        stdout: drain(stdout_reader),
        stderr: drain(stderr_reader),
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn drain(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Strips ANSI escape sequences from captured output. The compiler colors
/// its diagnostics unless told otherwise; parsing always happens on the
/// plain rendering.
pub fn strip_ansi(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_escape = false;
    for c in text.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            result.push(c);
        }
    }
    result
}

// =====================
// Scratch project
// =====================

/// The shared, disposable project directory every invocation runs in.
pub struct ScratchProject {
    parent: PathBuf,
    root: PathBuf,
}

impl ScratchProject {
    /// Directory name of the scratch project, under the compiler repo root.
    pub const DIR_NAME: &'static str = "vesper-test";

    pub fn new(parent: &Path) -> Self {
        ScratchProject {
            parent: parent.to_path_buf(),
            root: parent.join(Self::DIR_NAME),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the test source lands inside the project.
    pub fn entry_path(&self) -> PathBuf {
        self.root.join("src").join("lib.ves")
    }

    /// Deletes the project if it exists, then re-scaffolds it with the
    /// compiler's `new` command. Guarantees no contamination from prior
    /// runs. Scaffold failure is fatal: the directory state is unknown, so
    /// every later invocation would be suspect.
    pub fn reset(&self, compiler: &Path) -> Result<(), HarnessError> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root).map_err(|e| {
                HarnessError::io(
                    format!("failed to remove scratch project `{}`", self.root.display()),
                    e,
                )
            })?;
        }

        let output = Command::new(compiler)
            .arg("new")
            .arg(Self::DIR_NAME)
            .current_dir(&self.parent)
            .output()
            .map_err(|e| HarnessError::io("failed to run the scaffold command", e))?;

        if !output.status.success() {
            return Err(HarnessError::ScaffoldFailed {
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Overwrites the project's entry file with the test source.
    pub fn write_entry(&self, source: &str) -> Result<(), HarnessError> {
        let entry = self.entry_path();
        fs::write(&entry, source).map_err(|e| {
            HarnessError::io(format!("failed to write `{}`", entry.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_ansi_removes_color_sequences() {
        assert_eq!(strip_ansi("\x1b[31mfail\x1b[0m"), "fail");
        assert_eq!(strip_ansi("plain text"), "plain text");
    }

    #[test]
    fn scratch_paths_are_rooted_at_the_parent() {
        let scratch = ScratchProject::new(Path::new("/work"));
        assert_eq!(scratch.root(), Path::new("/work/vesper-test"));
        assert_eq!(
            scratch.entry_path(),
            Path::new("/work/vesper-test/src/lib.ves")
        );
    }
}
