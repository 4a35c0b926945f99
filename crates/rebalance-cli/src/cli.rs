//! CLI argument parsing using clap derive

use clap::Parser;
use rebalance_core::{DEFAULT_LEDGER_FILE, RunConfig, parse_flag};
use std::path::PathBuf;

/// Rebalance a pooled filesystem in place by rewriting every file under ROOT.
///
/// Each file is copied to `<name>.balance`, optionally verified against the
/// original, and moved over it so its data lands on freshly allocated blocks.
/// Completed passes are recorded in a ledger so interrupted runs can resume.
///
/// Do not run two rebalances on the same pool, or with the same ledger, at
/// the same time.
///
/// Examples:
///   rebalance /mnt/pool                    # one verified pass
///   rebalance -p 3 /mnt/pool/media         # up to three passes per file
///   rebalance -c false -p 0 /mnt/pool      # unverified, untracked
#[derive(Parser, Debug)]
#[command(name = "rebalance")]
#[command(author, version, about, long_about)]
pub struct Cli {
    /// Compare original and copy before replacing (1, on, true or yes enable it)
    #[arg(short, long, env = "REBALANCE_CHECKSUM", default_value = "true")]
    pub checksum: String,

    /// Passes per file before it is skipped; 0 rewrites every file on every run
    #[arg(short, long, env = "REBALANCE_PASSES", default_value_t = 1)]
    pub passes: u64,

    /// Skip files that have more than one hard link
    #[arg(short, long, env = "REBALANCE_SKIP_HARDLINKS", default_value = "false")]
    pub skip_hardlinks: String,

    /// Pass ledger location
    #[arg(long, env = "REBALANCE_LEDGER", default_value = DEFAULT_LEDGER_FILE)]
    pub ledger: PathBuf,

    /// Print the run summary as JSON on success
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory (or single file) to rebalance
    pub root: Option<PathBuf>,
}

impl Cli {
    /// Run configuration described by the parsed arguments.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            checksum_enabled: parse_flag(&self.checksum),
            max_passes: self.passes,
            skip_hardlinks: parse_flag(&self.skip_hardlinks),
            ledger_path: self.ledger.clone(),
        }
    }
}
