//! # dirsync CLI
//!
//! Mirror a source directory tree into a destination tree.
//!
//! ## Usage
//! ```bash
//! # Full sync with checksums, one analyzer pair per CPU
//! dirsync ./project /mnt/backup/project
//!
//! # Metadata-only comparison, sequential, show what would change
//! dirsync --date-size-only --no-parallel --dry-run ./project /mnt/backup/project
//! ```

use clap::Parser;
use colored::*;
use dirsync::{utils, SyncConfig, Synchronizer};
use humantime::format_duration;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Mirror a source directory tree into a destination tree
#[derive(Parser)]
#[command(name = "dirsync")]
#[command(version)]
#[command(about = "One-way directory synchronization: copy new and changed files, preserve permissions and mtimes")]
#[command(long_about = None)]
struct Cli {
    /// Source directory
    source: PathBuf,

    /// Destination directory (must exist and be writable)
    destination: PathBuf,

    /// Number of analyzer workers per tree side (defaults to CPU count)
    #[arg(short = 'n', long)]
    analyzers: Option<usize>,

    /// Compare by date and size only, skipping MD5 checksums
    #[arg(long)]
    date_size_only: bool,

    /// Run sequentially in the calling thread (cancels -n)
    #[arg(long)]
    no_parallel: bool,

    /// Perform a trial run with no changes made
    #[arg(long)]
    dry_run: bool,

    /// Report each copied file
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = SyncConfig::new(&cli.source, &cli.destination)
        .with_checksum(!cli.date_size_only)
        .with_parallel(!cli.no_parallel)
        .with_dry_run(cli.dry_run)
        .with_verbose(cli.verbose);
    if let Some(analyzers) = cli.analyzers {
        config = config.with_analyzers(analyzers);
    }

    match Synchronizer::new(config).run() {
        Ok(report) => {
            let headline = if report.dry_run {
                format!(
                    "dry run: {} file(s) would be copied ({} new, {} changed)",
                    report.total_copies(),
                    report.files_created,
                    report.files_updated
                )
            } else {
                format!(
                    "{} file(s) copied ({} new, {} changed), {}",
                    report.total_copies(),
                    report.files_created,
                    report.files_updated,
                    utils::format_bytes(report.bytes_copied)
                )
            };
            println!(
                "{} {} in {}",
                "✓".green().bold(),
                headline,
                format_duration(Duration::from_millis(report.duration_ms))
            );
            if report.destination_only > 0 {
                println!(
                    "  {} file(s) exist only in the destination and were preserved",
                    report.destination_only
                );
            }
            for warning in &report.warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning);
            }
            if report.warnings.is_empty() {
                ExitCode::SUCCESS
            } else {
                // Partial success: some entries could not be copied.
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dirsync={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
