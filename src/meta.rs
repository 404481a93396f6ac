//! Environment metadata recorded into every batch report.
//!
//! Everything here is best-effort: a missing `git` or `cargo` must not stop
//! a test run, so lookups degrade to placeholder values instead of failing.

use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Normalized platform tag used in report file names.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Mac,
    Windows,
    Unknown,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
            Platform::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Meta {
    /// Full hash of the checked-out commit, or `None` outside a repository.
    pub commit_hash: Option<String>,
    pub is_repo_clean: bool,
    pub cargo_version: String,
    pub rustc_version: String,
    pub platform: Platform,
    pub started_at_epoch_secs: u64,
}

impl Meta {
    /// First 9 hex digits of the commit hash, the same prefix length the
    /// report file name uses. `unknown` outside a repository.
    pub fn revision_prefix(&self) -> String {
        match self.commit_hash.as_deref().and_then(|hash| hash.get(0..9)) {
            Some(prefix) => prefix.to_string(),
            None => "unknown".to_string(),
        }
    }
}

/// Gathers the environment snapshot for a run.
pub fn collect() -> Meta {
    Meta {
        commit_hash: current_commit(),
        is_repo_clean: is_repo_clean(),
        cargo_version: command_line("cargo", &["--version"])
            .unwrap_or_else(|| "unavailable".to_string()),
        rustc_version: command_line("rustc", &["--version"])
            .unwrap_or_else(|| "unavailable".to_string()),
        platform: Platform::current(),
        started_at_epoch_secs: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    }
}

/// Hash of the current commit, if we are inside a git repository.
pub fn current_commit() -> Option<String> {
    command_line("git", &["rev-parse", "HEAD"])
}

/// True when the working tree carries no modification, addition, or
/// deletion. Untracked files do not count as dirt.
pub fn is_repo_clean() -> bool {
    let Some(status) = command_line("git", &["status", "--porcelain"]) else {
        return false;
    };
    status.lines().all(|line| {
        let prefix: String = line.chars().take(2).collect();
        !prefix.contains('M') && !prefix.contains('A') && !prefix.contains('D')
    })
}

fn command_line(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
