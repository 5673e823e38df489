//! dupetree - Redundant Directory Finder
//!
//! Fingerprints every file below one or more roots, treating zip archives as
//! directories, and reports which directory subtrees are identical or share
//! most of their content.
//!
//! The pipeline per root:
//!
//! 1. [`scanner::Walker`] builds the fingerprint tree and an index of every
//!    directory and archive
//! 2. [`duplicates::RedundancyDetector`] compares every unrelated pair of
//!    indexed directories, skipping pairs implied by identical ancestors
//! 3. [`output`] renders the sorted pairs as text or JSON

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;

use crate::cli::{Cli, Commands, ConfigArgs, OutputFormat};
use crate::config::Config;
use crate::duplicates::RedundancyDetector;
use crate::error::ExitCode;
use crate::output::{RootReport, ScanReport};
use crate::progress::{Progress, ProgressCallback, PHASE_FINGERPRINT};
use crate::scanner::{DiskSource, FingerprintFn, Fingerprinter, Walker};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, a scan root cannot be
/// walked, the run was interrupted, or output cannot be written.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    // `config --init` may name a file that does not exist yet
    let layered_file = match (&cli.command, cli.config.as_deref()) {
        (Commands::Config(args), Some(path)) if args.init && !path.exists() => None,
        (_, file) => file,
    };
    let mut config = Config::load(layered_file)?;

    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    logging::init_logging(cli.verbose, cli.quiet, log_file.as_deref())?;

    if cli.no_color {
        config.no_color = true;
    }

    match cli.command {
        Commands::Config(ref args) => run_config(&config, cli.config.as_deref(), args),
        Commands::Scan(ref args) => {
            config.apply_scan_args(args);
            let report = scan_paths(&config, &args.paths, cli.quiet)?;

            let color = !config.no_color
                && config.output == OutputFormat::Text
                && std::io::stdout().is_terminal();
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            output::render(&report, config.output, color, &mut handle)?;
            Ok(report.exit_code())
        }
    }
}

/// Scan each path in turn and collect the per-root results.
///
/// Progress bars are hidden when `quiet` is set or the output is JSON.
///
/// # Errors
///
/// Returns the first root that fails, or the interruption.
pub fn scan_paths(config: &Config, paths: &[PathBuf], quiet: bool) -> anyhow::Result<ScanReport> {
    let handler = signal::install_handler();
    let progress = Arc::new(Progress::new(quiet || config.output == OutputFormat::Json));

    let fingerprinter = Fingerprinter::new(config.digest);
    let walker = Walker::new(config.to_walker_config())
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(Arc::clone(&progress) as Arc<dyn ProgressCallback>);
    let detector = RedundancyDetector::new(
        config
            .to_detector_config(handler.get_flag())
            .with_progress_callback(Arc::clone(&progress) as Arc<dyn ProgressCallback>),
    );

    log::debug!(
        "Scanning {} root(s) with {} digests, {} comparison thread(s)",
        paths.len(),
        config.digest,
        config.effective_threads()
    );

    let mut roots = Vec::with_capacity(paths.len());
    for path in paths {
        roots.push(scan_root(
            path,
            &walker,
            &detector,
            &fingerprinter,
            progress.as_ref(),
        )?);
    }

    Ok(ScanReport::new(roots).with_identical_threshold(config.identical_threshold))
}

/// Walk one root from disk and detect its redundant pairs.
///
/// # Errors
///
/// Returns an error if the root cannot be walked or the run was interrupted.
pub fn scan_root(
    path: &Path,
    walker: &Walker,
    detector: &RedundancyDetector,
    fingerprint: &dyn FingerprintFn,
    progress: &dyn ProgressCallback,
) -> anyhow::Result<RootReport> {
    let start = Instant::now();

    progress.on_message(&path.display().to_string());
    progress.on_phase_start(PHASE_FINGERPRINT, 0);
    let walk = walker.walk(&DiskSource::new(path), fingerprint);
    progress.on_phase_end(PHASE_FINGERPRINT);
    let walk = walk.with_context(|| format!("Failed to scan {}", path.display()))?;

    let pairs = detector
        .detect(&walk.index)
        .with_context(|| format!("Failed to compare directories under {}", path.display()))?;

    let elapsed = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(RootReport::new(path.to_path_buf(), pairs, walk.stats).with_duration_ms(elapsed))
}

/// Handle `dupetree config`.
fn run_config(
    config: &Config,
    explicit: Option<&Path>,
    args: &ConfigArgs,
) -> anyhow::Result<ExitCode> {
    if args.init {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(Config::config_path)
            .context("Cannot determine a configuration directory; pass --config")?;
        config.save(&path)?;
        println!("Wrote {}", path.display());
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(ExitCode::Success)
}
