//! Defines the command-line arguments and subcommands for the harness.
//!
//! Uses `clap` with its "derive" feature for a declarative, type-safe
//! argument structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "vesper-harness",
    version,
    about = "Regression-testing harness for the Vesper compiler."
)]
pub struct HarnessArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the compiler and run the single-file corpus against it.
    Run {
        /// Name filter: substring match; anchor with `^`/`$` for
        /// prefix/suffix/exact matches.
        filter: Option<String>,

        /// Compile the corpus without the standard library.
        #[arg(long)]
        no_std: bool,

        /// Per-invocation wall-clock timeout, in seconds.
        #[arg(long, default_value_t = 20)]
        timeout: u64,

        /// Keep colored compiler output verbatim in the report records.
        #[arg(long)]
        archive: bool,

        /// Run without capturing output, for interactive debugging.
        #[arg(long, conflicts_with = "archive")]
        dump: bool,

        /// Cargo features forwarded to the compiler build.
        #[arg(long)]
        features: Vec<String>,

        /// Repository of the compiler under test.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Directory holding the test corpus.
        #[arg(long, default_value = "tests/corpus")]
        corpus: PathBuf,
    },

    /// Run every suite — crate-level and single-file — and persist a batch
    /// report.
    All {
        /// Compile the corpus without the standard library.
        #[arg(long)]
        no_std: bool,

        /// Per-invocation wall-clock timeout, in seconds.
        #[arg(long, default_value_t = 20)]
        timeout: u64,

        /// Cargo features forwarded to the compiler build.
        #[arg(long)]
        features: Vec<String>,

        /// Repository of the compiler under test.
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Directory holding the test corpus.
        #[arg(long, default_value = "tests/corpus")]
        corpus: PathBuf,

        /// Where batch reports are written.
        #[arg(long, default_value = "results")]
        results: PathBuf,
    },

    /// Run the per-crate cargo suites only.
    Crates {
        /// Repository of the compiler under test.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },

    /// Render the workspace dependency graph to dep_graph.png.
    Depgraph {
        /// Repository of the compiler under test.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}
