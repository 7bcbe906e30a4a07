// codesift - app/pipeline.rs
//
// Pipeline orchestration: resolve inputs, fan out one worker per artifact
// file, join, decide pass/fail, then filter the tally and write the corpus.
//
// Architecture:
//   - Workers run on a dedicated rayon pool sized to the number of files
//     (or `max_workers`), inside a scope so they can borrow the shared tally.
//   - Each worker reports a per-file result value over an mpsc channel; the
//     orchestrator applies `FailurePolicy` to the collected results.
//   - Under `Abort`, the first fatal file error raises a shared flag so the
//     remaining workers stop at their next checkpoint.
//   - The output artifact is written to a temporary sibling and renamed into
//     place, so a failed run never leaves a partial or truncated corpus.

use crate::app::worker::{self, WorkerContext};
use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::export;
use crate::core::model::{
    CountingMode, FailurePolicy, FileReport, FileStats, FileStatus, LengthWindow, RunReport,
};
use crate::core::tally::{self, Tally};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{ConfigError, PipelineError, ReaderError, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

// =============================================================================
// Configuration
// =============================================================================

/// Explicit configuration for one pipeline run. Nothing the pipeline treats
/// as policy is hard-wired; every value here has a named default in
/// `util::constants`.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input entries: files, directories, or glob patterns.
    pub inputs: Vec<String>,

    /// Where the trusted corpus is written.
    pub output: PathBuf,

    /// Accepted trimmed token lengths.
    pub window: LengthWindow,

    /// Minimum count for a token to be emitted.
    pub threshold: u64,

    pub counting: CountingMode,

    pub on_error: FailurePolicy,

    /// Longest decoded line a file may contain.
    pub max_line_bytes: usize,

    /// Minimum distinct keys reserved in the tally up front. A larger
    /// reservation is made when the inputs' compressed size calls for it.
    pub tally_capacity: usize,

    /// Optional wall-clock limit per file.
    pub file_timeout: Option<Duration>,

    /// Cap on concurrently running workers. `None` runs one per file.
    pub max_workers: Option<usize>,

    /// Skip the run entirely when the output already holds data.
    pub reuse_existing: bool,

    pub discovery: DiscoveryConfig,

    /// Optional caller-owned cancel flag, checked by every worker.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl PipelineConfig {
    /// Defaults for everything except the inputs and the output path.
    pub fn new(inputs: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            window: LengthWindow::default(),
            threshold: constants::DEFAULT_REDUNDANCY_THRESHOLD,
            counting: CountingMode::default(),
            on_error: FailurePolicy::default(),
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
            tally_capacity: constants::DEFAULT_TALLY_CAPACITY,
            file_timeout: None,
            max_workers: None,
            reuse_existing: constants::DEFAULT_REUSE_EXISTING,
            discovery: DiscoveryConfig::default(),
            cancel_flag: None,
        }
    }

    /// Build a run configuration from validated `config.toml` values.
    ///
    /// The output path may still be empty here; callers that take it from
    /// elsewhere (the CLI) fill it in before `validate`.
    pub fn from_app_config(app: &AppConfig) -> std::result::Result<Self, ConfigError> {
        let mut config = Self::new(
            app.artifacts.clone(),
            app.output.clone().unwrap_or_default(),
        );
        config.window = LengthWindow::new(app.min_len, app.max_len)?;
        config.threshold = app.threshold;
        config.counting = if app.count_lines {
            CountingMode::Lines
        } else {
            CountingMode::DistinctFiles
        };
        config.on_error = if app.skip_failed_files {
            FailurePolicy::SkipFile
        } else {
            FailurePolicy::Abort
        };
        config.max_line_bytes = app.max_line_bytes;
        config.tally_capacity = app.tally_capacity;
        config.file_timeout = app.file_timeout_secs.map(Duration::from_secs);
        config.max_workers = app.max_workers;
        config.reuse_existing = app.reuse_existing;
        config.discovery = DiscoveryConfig {
            include_patterns: app.include_patterns.clone(),
            max_depth: app.max_depth,
        };
        Ok(config)
    }

    /// Check every value against its named bounds.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::MissingOutput);
        }
        if !(1..=constants::MAX_REDUNDANCY_THRESHOLD).contains(&self.threshold) {
            return Err(out_of_range(
                "threshold",
                self.threshold,
                format!("1-{}", constants::MAX_REDUNDANCY_THRESHOLD),
            ));
        }
        if !(constants::MIN_MAX_LINE_BYTES..=constants::ABSOLUTE_MAX_LINE_BYTES)
            .contains(&self.max_line_bytes)
        {
            return Err(out_of_range(
                "max_line_bytes",
                self.max_line_bytes,
                format!(
                    "{}-{}",
                    constants::MIN_MAX_LINE_BYTES,
                    constants::ABSOLUTE_MAX_LINE_BYTES
                ),
            ));
        }
        if self.tally_capacity > constants::ABSOLUTE_MAX_TALLY_CAPACITY {
            return Err(out_of_range(
                "tally_capacity",
                self.tally_capacity,
                format!("0-{}", constants::ABSOLUTE_MAX_TALLY_CAPACITY),
            ));
        }
        if self.max_workers == Some(0) {
            return Err(out_of_range(
                "max_workers",
                0,
                format!("1-{}", constants::ABSOLUTE_MAX_INPUT_FILES),
            ));
        }
        Ok(())
    }
}

fn out_of_range(field: &str, value: impl ToString, expected: String) -> ConfigError {
    ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

// =============================================================================
// Run
// =============================================================================

/// Per-file result value sent from a worker to the orchestrator.
struct WorkerOutcome {
    index: usize,
    result: std::result::Result<FileStats, ReaderError>,
    elapsed_ms: u64,
}

/// Run the pipeline to completion.
///
/// On success the output artifact holds exactly the tokens whose count met
/// the threshold. On failure the output path is untouched.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;

    let started_at = Utc::now();
    let clock = Instant::now();

    if config.reuse_existing && fs::has_content(&config.output) {
        tracing::info!(
            output = %config.output.display(),
            "Output artifact already populated, skipping run"
        );
        return Ok(build_report(config, started_at, clock, Vec::new(), 0, 0, true));
    }

    let (files, warnings) = discovery::resolve_inputs(&config.inputs, &config.discovery)?;
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Input warning");
    }

    let workers = config
        .max_workers
        .map_or(files.len(), |max| max.min(files.len()));

    tracing::info!(
        files = files.len(),
        workers,
        window = %config.window,
        threshold = config.threshold,
        counting = ?config.counting,
        on_error = ?config.on_error,
        "Pipeline starting"
    );

    let compressed_bytes: u64 = files.iter().map(|f| fs::file_size(f)).sum();
    let capacity = tally::estimated_capacity(compressed_bytes).max(config.tally_capacity);
    tracing::debug!(compressed_bytes, capacity, "Tally pre-sized");
    let tally = Tally::with_capacity(capacity);
    let abort = AtomicBool::new(false);
    let ctx = WorkerContext {
        tally: &tally,
        window: config.window,
        counting: config.counting,
        max_line_bytes: config.max_line_bytes,
        file_timeout: config.file_timeout,
        abort: &abort,
        cancel: config.cancel_flag.as_deref(),
    };

    let outcomes = fan_out(&files, workers, &ctx, config.on_error)?;

    if config
        .cancel_flag
        .as_ref()
        .is_some_and(|f| f.load(Ordering::SeqCst))
    {
        tracing::warn!("Run cancelled, no output written");
        return Err(PipelineError::Cancelled.into());
    }

    let (reports, fatal) = collect_reports(&files, outcomes, config.on_error);
    if let Some(e) = fatal {
        tracing::error!(error = %e, "Run aborted, no output written");
        return Err(e.into());
    }

    let distinct_tokens = tally.len() as u64;
    let threshold = config.threshold;
    let output = &config.output;
    let trusted_tokens = fs::write_atomically(output, |file| {
        export::write_corpus(tally.into_trusted(threshold), file, output)
    })?;

    let report = build_report(
        config,
        started_at,
        clock,
        reports,
        distinct_tokens,
        trusted_tokens,
        false,
    );

    tracing::info!(
        files = report.files.len(),
        failed = report.failed_files(),
        distinct = distinct_tokens,
        trusted = trusted_tokens,
        duration_ms = report.duration_ms,
        output = %output.display(),
        "Pipeline complete"
    );

    Ok(report)
}

/// Launch one job per file on a pool of `workers` threads and block until
/// every job has finished. Results are returned in completion order.
fn fan_out(
    files: &[PathBuf],
    workers: usize,
    ctx: &WorkerContext<'_>,
    policy: FailurePolicy,
) -> std::result::Result<Vec<WorkerOutcome>, PipelineError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("codesift-worker-{i}"))
        .build()
        .map_err(|source| PipelineError::ThreadPool { workers, source })?;

    let (tx, rx) = mpsc::channel::<WorkerOutcome>();

    pool.scope(|s| {
        for (index, path) in files.iter().enumerate() {
            let tx = tx.clone();
            s.spawn(move |_| {
                let started = Instant::now();
                let result = worker::process_file(path, ctx);

                if let Err(e) = &result {
                    if policy == FailurePolicy::Abort && !e.is_cancellation() {
                        // Stop siblings at their next checkpoint.
                        ctx.abort.store(true, Ordering::SeqCst);
                    }
                }

                // The receiver outlives the scope.
                let _ = tx.send(WorkerOutcome {
                    index,
                    result,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            });
        }
    });
    drop(tx);

    Ok(rx.into_iter().collect())
}

/// Turn worker outcomes into per-file reports, ordered like `files`, and pick
/// out the error that fails the run under `Abort`.
fn collect_reports(
    files: &[PathBuf],
    outcomes: Vec<WorkerOutcome>,
    policy: FailurePolicy,
) -> (Vec<FileReport>, Option<ReaderError>) {
    let mut indexed: Vec<(usize, FileReport)> = Vec::with_capacity(outcomes.len());
    let mut fatal: Option<ReaderError> = None;

    // Completion order: the first real failure received is the one that
    // triggered the abort.
    for outcome in outcomes {
        let path = files[outcome.index].clone();
        let report = match outcome.result {
            Ok(stats) => FileReport::completed(path, stats, outcome.elapsed_ms),
            Err(e) if e.is_cancellation() => FileReport::failed(
                path,
                FileStatus::Cancelled,
                e.to_string(),
                outcome.elapsed_ms,
            ),
            Err(e) => {
                let report =
                    FileReport::failed(path, FileStatus::Failed, e.to_string(), outcome.elapsed_ms);
                match policy {
                    FailurePolicy::SkipFile => {
                        tracing::warn!(error = %e, "File skipped, its tokens are not counted");
                    }
                    FailurePolicy::Abort => {
                        if fatal.is_none() {
                            fatal = Some(e);
                        } else {
                            tracing::debug!(error = %e, "Additional file failure");
                        }
                    }
                }
                report
            }
        };
        indexed.push((outcome.index, report));
    }

    indexed.sort_by_key(|(index, _)| *index);
    (indexed.into_iter().map(|(_, r)| r).collect(), fatal)
}

fn build_report(
    config: &PipelineConfig,
    started_at: DateTime<Utc>,
    clock: Instant,
    files: Vec<FileReport>,
    distinct_tokens: u64,
    trusted_tokens: u64,
    reused_existing: bool,
) -> RunReport {
    RunReport {
        started_at,
        duration_ms: clock.elapsed().as_millis() as u64,
        output: config.output.clone(),
        reused_existing,
        window: config.window,
        threshold: config.threshold,
        counting: config.counting,
        on_error: config.on_error,
        files,
        distinct_tokens,
        trusted_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::error::CodeSiftError;

    #[test]
    fn test_new_uses_named_defaults() {
        let config = PipelineConfig::new(vec!["a.gz".into()], "out.txt");
        assert_eq!(config.window, LengthWindow::default());
        assert_eq!(config.threshold, constants::DEFAULT_REDUNDANCY_THRESHOLD);
        assert_eq!(config.counting, CountingMode::DistinctFiles);
        assert_eq!(config.on_error, FailurePolicy::Abort);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = PipelineConfig::new(vec!["a.gz".into()], "out.txt");

        let mut c = base.clone();
        c.threshold = 0;
        assert!(matches!(c.validate(), Err(ConfigError::ValueOutOfRange { .. })));

        let mut c = base.clone();
        c.max_line_bytes = 10;
        assert!(matches!(c.validate(), Err(ConfigError::ValueOutOfRange { .. })));

        let mut c = base.clone();
        c.max_workers = Some(0);
        assert!(matches!(c.validate(), Err(ConfigError::ValueOutOfRange { .. })));

        let mut c = base;
        c.output = PathBuf::new();
        assert!(matches!(c.validate(), Err(ConfigError::MissingOutput)));
    }

    #[test]
    fn test_from_app_config_maps_policies() {
        let app = AppConfig {
            artifacts: vec!["x.gz".into()],
            output: Some(PathBuf::from("codes.txt")),
            min_len: 6,
            max_len: 12,
            threshold: 3,
            count_lines: true,
            skip_failed_files: true,
            file_timeout_secs: Some(30),
            max_workers: Some(2),
            reuse_existing: false,
            ..AppConfig::default()
        };

        let config = PipelineConfig::from_app_config(&app).unwrap();
        assert_eq!(config.window, LengthWindow::new(6, 12).unwrap());
        assert_eq!(config.threshold, 3);
        assert_eq!(config.counting, CountingMode::Lines);
        assert_eq!(config.on_error, FailurePolicy::SkipFile);
        assert_eq!(config.file_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_workers, Some(2));
        assert!(!config.reuse_existing);
        assert_eq!(config.output, PathBuf::from("codes.txt"));
    }

    #[test]
    fn test_from_app_config_rejects_inverted_window() {
        let app = AppConfig {
            min_len: 12,
            max_len: 6,
            ..AppConfig::default()
        };
        assert!(matches!(
            PipelineConfig::from_app_config(&app),
            Err(ConfigError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_run_without_output_is_config_error() {
        let config = PipelineConfig::new(vec!["a.gz".into()], "");
        assert!(matches!(
            run(&config),
            Err(CodeSiftError::Config(ConfigError::MissingOutput))
        ));
    }

    #[test]
    fn test_collect_reports_orders_by_input_and_picks_first_failure() {
        let files = vec![PathBuf::from("a.gz"), PathBuf::from("b.gz"), PathBuf::from("c.gz")];
        let outcomes = vec![
            WorkerOutcome {
                index: 2,
                result: Err(ReaderError::LineTooLong {
                    path: files[2].clone(),
                    line_number: 1,
                    max_bytes: 1024,
                }),
                elapsed_ms: 1,
            },
            WorkerOutcome {
                index: 0,
                result: Err(ReaderError::Cancelled {
                    path: files[0].clone(),
                }),
                elapsed_ms: 1,
            },
            WorkerOutcome {
                index: 1,
                result: Ok(FileStats::default()),
                elapsed_ms: 1,
            },
        ];

        let (reports, fatal) = collect_reports(&files, outcomes, FailurePolicy::Abort);

        let statuses: Vec<FileStatus> = reports.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![FileStatus::Cancelled, FileStatus::Completed, FileStatus::Failed]
        );
        assert!(matches!(fatal, Some(ReaderError::LineTooLong { .. })));
    }

    #[test]
    fn test_collect_reports_skip_policy_has_no_fatal() {
        let files = vec![PathBuf::from("a.gz")];
        let outcomes = vec![WorkerOutcome {
            index: 0,
            result: Err(ReaderError::LineTooLong {
                path: files[0].clone(),
                line_number: 1,
                max_bytes: 1024,
            }),
            elapsed_ms: 1,
        }];

        let (reports, fatal) = collect_reports(&files, outcomes, FailurePolicy::SkipFile);
        assert!(fatal.is_none());
        assert_eq!(reports[0].status, FileStatus::Failed);
        assert!(reports[0].error.is_some());
    }
}
