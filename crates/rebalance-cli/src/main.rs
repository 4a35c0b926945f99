//! Rebalance CLI
//!
//! Rewrites every file under a pool root in place so the pool's allocator
//! spreads the data over all member devices.

mod cli;
mod console;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use rebalance_core::{Orchestrator, RunConfig, RunContext, RunSummary};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::Cli;
use console::ConsoleReporter;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(root) = cli.root.as_deref() else {
        // No root given: show usage, nothing to do
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let root = resolve_root(root)?;
    let config = cli.run_config();
    tracing::debug!(?config, root = %root.display(), "Resolved run configuration");

    let summary = cmd_rebalance(&root, config.clone(), cli.verbose, cli.json)?;

    if cli.json {
        let report = JsonReport {
            root: &root,
            config: &config,
            summary: &summary,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn cmd_rebalance(root: &Path, config: RunConfig, verbose: bool, json: bool) -> Result<RunSummary> {
    let capabilities = rebalance_fs::detect()?;
    tracing::debug!(capabilities = capabilities.name(), "Detected file capabilities");

    let mut context = RunContext::new(config)?;
    let mut reporter = ConsoleReporter::new(verbose, json);
    let summary = Orchestrator::new(capabilities.as_ref(), &mut reporter).run(&mut context, root)?;
    Ok(summary)
}

/// Canonical form of the root, so ledger keys do not depend on how the path
/// was typed.
fn resolve_root(root: &Path) -> Result<PathBuf> {
    dunce::canonicalize(root).map_err(|e| match e.kind() {
        ErrorKind::NotFound => rebalance_fs::Error::RootNotFound {
            path: root.to_path_buf(),
        }
        .into(),
        _ => rebalance_fs::Error::io(root, e).into(),
    })
}

fn init_tracing(verbose: bool) {
    if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    } else if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}

/// `--json` output
#[derive(Serialize)]
struct JsonReport<'a> {
    root: &'a Path,
    config: &'a RunConfig,
    summary: &'a RunSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_root_reports_missing_root() {
        let dir = TempDir::new().unwrap();
        let error = resolve_root(&dir.path().join("absent")).unwrap_err();
        assert!(error.to_string().starts_with("Root path not found"));
    }

    #[test]
    fn resolve_root_removes_dot_segments() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("pool")).unwrap();

        let resolved = resolve_root(&dir.path().join("pool/./../pool")).unwrap();

        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("pool"));
        assert!(!resolved.to_string_lossy().contains(".."));
    }

    #[test]
    fn json_report_includes_config_and_summary() {
        let config = RunConfig::default();
        let summary = RunSummary {
            file_count: 2,
            rebalanced: 2,
            ..RunSummary::default()
        };
        let report = JsonReport {
            root: Path::new("/pool"),
            config: &config,
            summary: &summary,
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["root"], "/pool");
        assert_eq!(value["config"]["max_passes"], 1);
        assert_eq!(value["summary"]["rebalanced"], 2);
    }
}
