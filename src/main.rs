// codesift - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading (explicit --config, else the platform default)
// 3. Logging initialisation (debug mode support)
// 4. CLI overrides on top of the file configuration
// 5. Running the pipeline and writing the optional JSON report

use clap::{Parser, ValueEnum};
use codesift::app::pipeline::{self, PipelineConfig};
use codesift::core::export;
use codesift::core::model::{CountingMode, FailurePolicy, LengthWindow, RunReport};
use codesift::platform::{self, config::AppConfig, fs};
use codesift::util::{self, error::CodeSiftError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// codesift - build a trusted code corpus from redundant artifact files.
///
/// Every input is a gzip-compressed, newline-delimited text file. A trimmed
/// line whose length falls in the configured window is a candidate code; a
/// code seen in at least `--threshold` distinct files is written to the
/// output, one per line.
#[derive(Parser, Debug)]
#[command(name = "codesift", version, about)]
struct Cli {
    /// Artifact files, directories, or glob patterns (adds to [input] artifacts).
    inputs: Vec<String>,

    /// Output corpus path.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Config file (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Shortest accepted code length.
    #[arg(long = "min-len")]
    min_len: Option<usize>,

    /// Longest accepted code length.
    #[arg(long = "max-len")]
    max_len: Option<usize>,

    /// Minimum number of distinct files a code must appear in.
    #[arg(short = 't', long = "threshold")]
    threshold: Option<u64>,

    /// Count every accepted line instead of every distinct file.
    #[arg(long = "count-lines")]
    count_lines: bool,

    /// What to do when one file cannot be read.
    #[arg(long = "on-error", value_enum)]
    on_error: Option<OnError>,

    /// Per-file time limit in seconds.
    #[arg(long = "file-timeout-secs")]
    file_timeout_secs: Option<u64>,

    /// Cap on concurrently processed files (default: one worker per file).
    #[arg(short = 'j', long = "workers")]
    workers: Option<usize>,

    /// Rebuild the corpus even if the output already holds data.
    #[arg(short = 'f', long = "force")]
    force: bool,

    /// Write a JSON run report to this path.
    #[arg(long = "report")]
    report: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnError {
    /// Fail the whole run; no output is written.
    Abort,
    /// Drop the failed file and continue with the rest.
    Skip,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => FailurePolicy::Abort,
            OnError::Skip => FailurePolicy::SkipFile,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Load configuration before logging so the configured level applies.
    let (app_config, config_warnings) = match &cli.config {
        Some(path) => match platform::config::load_config_file(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        None => {
            platform::config::load_default_config(&platform::config::PlatformPaths::resolve())
        }
    };

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "codesift starting"
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    let report_path = cli.report.clone().or_else(|| app_config.report.clone());

    let result = build_config(&cli, &app_config).and_then(|config| pipeline::run(&config));

    match result {
        Ok(report) => {
            if let Some(path) = report_path {
                if let Err(e) = write_report(&report, &path) {
                    tracing::error!(error = %e, "Failed to write run report");
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            }
            if report.reused_existing {
                println!(
                    "{} already populated, nothing to do (use --force to rebuild)",
                    report.output.display()
                );
            } else {
                println!(
                    "{} codes written to {} ({} files, {} failed)",
                    report.trusted_tokens,
                    report.output.display(),
                    report.files.len(),
                    report.failed_files()
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Merge CLI flags over the file configuration. CLI values win.
fn build_config(cli: &Cli, app: &AppConfig) -> Result<PipelineConfig, CodeSiftError> {
    let mut config = PipelineConfig::from_app_config(app)?;

    config.inputs.extend(cli.inputs.iter().cloned());
    if let Some(output) = &cli.output {
        config.output = output.clone();
    }
    if cli.min_len.is_some() || cli.max_len.is_some() {
        config.window = LengthWindow::new(
            cli.min_len.unwrap_or(config.window.min()),
            cli.max_len.unwrap_or(config.window.max()),
        )?;
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if cli.count_lines {
        config.counting = CountingMode::Lines;
    }
    if let Some(on_error) = cli.on_error {
        config.on_error = on_error.into();
    }
    if let Some(secs) = cli.file_timeout_secs {
        config.file_timeout = (secs > 0).then(|| Duration::from_secs(secs));
    }
    if let Some(workers) = cli.workers {
        config.max_workers = Some(workers);
    }
    if cli.force {
        config.reuse_existing = false;
    }

    Ok(config)
}

fn write_report(report: &RunReport, path: &Path) -> Result<(), CodeSiftError> {
    fs::write_atomically(path, |file| export::export_report(report, file, path))?;
    tracing::info!(path = %path.display(), "Run report written");
    Ok(())
}
