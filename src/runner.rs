//! Sequential orchestration of a corpus run.
//!
//! Every test file goes through the same cycle: scratch reset → invoke →
//! classify → parse diagnostics → evaluate expectation → record. The cycle
//! is strictly sequential because all invocations share one scratch
//! directory; isolation comes from the reset, not from concurrency control.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::corpus::{self, TestFile};
use crate::crate_suite;
use crate::diagnostics;
use crate::driver::{self, CaptureMode, InvokeError, ScratchProject};
use crate::errors::HarnessError;
use crate::expect::Expectation;
use crate::meta;
use crate::report::{self, BatchReport, FileReport, Summary};
use crate::run_result::{RunResult, RunStatus};
use crate::toolchain;

// Color constants for terminal output
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Configuration for one harness run.
pub struct HarnessConfig {
    /// Repository of the compiler under test.
    pub compiler_root: PathBuf,
    /// Directory holding the `.ves` corpus.
    pub corpus_root: PathBuf,
    /// Where batch reports are persisted.
    pub results_dir: PathBuf,
    /// Optional name filter (substring, `^`/`$` anchoring).
    pub filter: Option<String>,
    /// Wall-clock deadline per invocation.
    pub timeout: Duration,
    /// Pass `--no-std` to the compiler.
    pub no_std: bool,
    /// Pass `--emit-irs` to the compiler.
    pub emit_irs: bool,
    /// Optional explicit target file appended to the test command.
    pub target: Option<String>,
    /// Cargo features forwarded to the compiler build.
    pub features: Vec<String>,
    pub capture: CaptureMode,
    pub use_colors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            compiler_root: PathBuf::from("."),
            corpus_root: PathBuf::from("tests/corpus"),
            results_dir: PathBuf::from("results"),
            filter: None,
            timeout: Duration::from_secs(20),
            no_std: false,
            emit_irs: true,
            target: None,
            features: Vec::new(),
            capture: CaptureMode::Parse,
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl HarnessConfig {
    /// Apply color formatting to text if colors are enabled.
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Runs the single-file corpus: discovery, compiler build, then the per-file
/// cycle. Returns the name-ordered per-file reports.
///
/// Discovery runs first so a filter that matches nothing aborts before any
/// process is spawned.
pub fn run_corpus(config: &HarnessConfig) -> Result<Vec<FileReport>, HarnessError> {
    let files = corpus::load_corpus(&config.corpus_root, config.filter.as_deref())?;
    let compiler = toolchain::build_compiler(&config.compiler_root, &config.features)?;
    let scratch = ScratchProject::new(&config.compiler_root);

    let mut reports = Vec::with_capacity(files.len());
    let mut success = 0;
    let mut fail = 0;

    for file in &files {
        println!("running `{}`...", file.name);
        let file_report = run_file(file, &compiler, &scratch, config)?;

        if file_report.passed() {
            println!("{}: {}", file.name, config.colorize("pass", GREEN));
            success += 1;
        } else {
            let (label, color) = match file_report.status {
                RunStatus::Timeout => ("timeout", YELLOW),
                _ => ("fail", RED),
            };
            println!(
                "{}: {} [{}]",
                file.name,
                config.colorize(label, color),
                file_report.status
            );
            if let Some(detail) = &file_report.error {
                println!("  {detail}");
            }
            fail += 1;
        }
        reports.push(file_report);
    }

    println!("success: {success}, fail: {fail}");
    Ok(reports)
}

/// One full cycle for one test file. Only infrastructure failures escape;
/// every test-level failure is folded into the returned record.
pub fn run_file(
    file: &TestFile,
    compiler: &Path,
    scratch: &ScratchProject,
    config: &HarnessConfig,
) -> Result<FileReport, HarnessError> {
    let started_at = Instant::now();

    scratch.reset(compiler)?;
    scratch.write_entry(&file.source)?;

    let mut args: Vec<String> = vec!["test".to_string()];
    if config.no_std {
        args.push("--no-std".to_string());
    }
    if config.emit_irs {
        args.push("--emit-irs".to_string());
    }
    if config.capture == CaptureMode::Parse {
        args.push("--color=never".to_string());
    }
    if let Some(target) = &config.target {
        args.push(target.clone());
    }

    let invocation = driver::invoke(compiler, &args, scratch.root(), config.timeout, config.capture);

    let mut captured = CapturedText::default();
    let mut result = match invocation {
        Ok(output) => {
            captured = CapturedText::from_output(
                &output.stdout,
                &output.stderr,
                config.capture,
            );
            RunResult::with_status(RunStatus::from_exit_code(output.status.code()))
        }
        Err(InvokeError::Timeout) => RunResult::with_status(RunStatus::Timeout),
        Err(InvokeError::Io(e)) => {
            return Err(HarnessError::io(
                format!("failed to invoke the compiler on `{}`", file.name),
                e,
            ))
        }
    };

    // The compiler's own reporting broke: record the defect as this file's
    // failure and skip the expectation, which has nothing sound to inspect.
    let mut failure: Option<String> = None;
    if result.status.has_parseable_output() {
        match diagnostics::parse_diagnostics(captured.stderr.as_deref().unwrap_or_default()) {
            Ok((errors, warnings)) => {
                result.errors = errors;
                result.warnings = warnings;
            }
            Err(defect) => failure = Some(format!("compiler defect: {defect}")),
        }
    }

    if failure.is_none() && config.capture != CaptureMode::PassThrough {
        failure = match Expectation::for_file(&file.source) {
            Ok(expectation) => expectation.check(&result).err(),
            Err(e) => Some(e.to_string()),
        };
    }

    Ok(FileReport {
        name: file.name.clone(),
        status: result.status,
        error: failure,
        stdout: captured.stdout,
        stderr: captured.stderr,
        stdout_colored: captured.stdout_colored,
        stderr_colored: captured.stderr_colored,
        errors: result.errors,
        warnings: result.warnings,
        hash: file.hash.clone(),
        elapsed_ms: started_at.elapsed().as_millis() as u64,
    })
}

/// Captured output split into the renderings the report stores.
#[derive(Default)]
struct CapturedText {
    stdout: Option<String>,
    stderr: Option<String>,
    stdout_colored: Option<String>,
    stderr_colored: Option<String>,
}

impl CapturedText {
    fn from_output(stdout: &[u8], stderr: &[u8], mode: CaptureMode) -> Self {
        let stdout = String::from_utf8_lossy(stdout).to_string();
        let stderr = String::from_utf8_lossy(stderr).to_string();
        match mode {
            // Color was already suppressed at the compiler.
            CaptureMode::Parse => CapturedText {
                stdout: Some(stdout),
                stderr: Some(stderr),
                stdout_colored: None,
                stderr_colored: None,
            },
            CaptureMode::Archive => CapturedText {
                stdout: Some(driver::strip_ansi(&stdout)),
                stderr: Some(driver::strip_ansi(&stderr)),
                stdout_colored: Some(stdout),
                stderr_colored: Some(stderr),
            },
            CaptureMode::PassThrough => CapturedText::default(),
        }
    }
}

/// Runs every suite — crate-level and single-file — and persists the batch
/// report. Warns loudly when the repository is dirty: the report will be
/// filed under a `-dirty` name and is not comparable across commits.
pub fn run_all(config: &HarnessConfig) -> Result<BatchReport, HarnessError> {
    let run_meta = meta::collect();

    if !run_meta.is_repo_clean {
        println!("@@@@@@@");
        println!("WARNING: The repository is dirty!");
        println!("Please commit changes before running the tests.");
        println!("@@@@@@@");
    }

    let crates_started = Instant::now();
    let crates = crate_suite::run_all(&config.compiler_root.join("crates"))?;
    let crates_elapsed = crates_started.elapsed().as_millis() as u64;

    let files_started = Instant::now();
    let files = run_corpus(config)?;
    let files_elapsed = files_started.elapsed().as_millis() as u64;

    let batch = BatchReport {
        file_summary: Some(Summary::from_files(&files, files_elapsed)),
        crate_summary: Some(Summary::from_crates(&crates, crates_elapsed)),
        meta: run_meta,
        files: Some(files),
        crates: Some(crates),
    };

    let path = report::persist(&batch, &config.results_dir)?;
    println!("report written to `{}`", path.display());
    Ok(batch)
}
