//! The harness command-line interface.
//!
//! This module is the entry point for all CLI commands and orchestrates the
//! core library functions. Failing tests exit with code 1; fatal harness
//! errors surface as miette diagnostics.

use std::process;
use std::time::Duration;

use clap::Parser;

use crate::cli::args::{Command, HarnessArgs};
use crate::crate_suite;
use crate::driver::CaptureMode;
use crate::runner::{self, HarnessConfig};
use crate::toolchain;

pub mod args;

/// The main entry point for the CLI.
pub fn run() -> miette::Result<()> {
    let args = HarnessArgs::parse();

    match args.command {
        Command::Run {
            filter,
            no_std,
            timeout,
            archive,
            dump,
            features,
            root,
            corpus,
        } => {
            let capture = if dump {
                CaptureMode::PassThrough
            } else if archive {
                CaptureMode::Archive
            } else {
                CaptureMode::Parse
            };
            let config = HarnessConfig {
                compiler_root: root,
                corpus_root: corpus,
                filter,
                timeout: Duration::from_secs(timeout),
                no_std,
                features,
                capture,
                ..HarnessConfig::default()
            };

            let reports = runner::run_corpus(&config)?;
            if reports.iter().any(|r| !r.passed()) {
                process::exit(1);
            }
        }

        Command::All {
            no_std,
            timeout,
            features,
            root,
            corpus,
            results,
        } => {
            let config = HarnessConfig {
                compiler_root: root,
                corpus_root: corpus,
                results_dir: results,
                timeout: Duration::from_secs(timeout),
                no_std,
                features,
                ..HarnessConfig::default()
            };

            let batch = runner::run_all(&config)?;
            let failed = batch.file_summary.map_or(0, |s| s.fail)
                + batch.crate_summary.map_or(0, |s| s.fail);
            if failed > 0 {
                process::exit(1);
            }
        }

        Command::Crates { root } => {
            let crates = crate_suite::run_all(&root.join("crates"))?;
            if crates.iter().any(|c| c.has_error()) {
                process::exit(1);
            }
        }

        Command::Depgraph { root } => {
            let path = toolchain::render_depgraph(&root)?;
            println!("dependency graph written to `{}`", path.display());
        }
    }

    Ok(())
}
