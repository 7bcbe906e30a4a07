// codesift - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Length window
// =============================================================================

/// Inclusive window of accepted token lengths, in characters.
///
/// A valid code has a fixed-width shape, so the window is policy: lines whose
/// trimmed length falls outside it never reach the tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct LengthWindow {
    min: usize,
    max: usize,
}

/// Unchecked serialized form; every deserialized window goes through `new`.
#[derive(Deserialize)]
struct RawWindow {
    min: usize,
    max: usize,
}

impl TryFrom<RawWindow> for LengthWindow {
    type Error = ConfigError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl LengthWindow {
    /// Build a window, rejecting empty, inverted, or oversized ranges.
    pub fn new(min: usize, max: usize) -> Result<Self, ConfigError> {
        if min == 0 || min > max {
            return Err(ConfigError::InvalidWindow { min, max });
        }
        if max > constants::ABSOLUTE_MAX_TOKEN_LEN {
            return Err(ConfigError::ValueOutOfRange {
                field: "max_len".to_string(),
                value: max.to_string(),
                expected: format!("1-{}", constants::ABSOLUTE_MAX_TOKEN_LEN),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// True if `len` lies within `[min, max]`.
    pub fn contains(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

impl Default for LengthWindow {
    fn default() -> Self {
        Self {
            min: constants::DEFAULT_MIN_TOKEN_LEN,
            max: constants::DEFAULT_MAX_TOKEN_LEN,
        }
    }
}

impl std::fmt::Display for LengthWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

// =============================================================================
// Policies
// =============================================================================

/// What a file contributes to a token's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountingMode {
    /// A file adds at most one to a token's count, however many of its lines
    /// carry the token. The count is the number of distinct source files.
    #[default]
    DistinctFiles,

    /// Every accepted line adds one. A token repeated within a single file
    /// can reach the threshold on its own.
    Lines,
}

/// How the orchestrator reacts when one file cannot be read to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the remaining workers and fail the run. No output is written.
    #[default]
    Abort,

    /// Drop the failed file's contribution, record the failure in the
    /// report, and emit the corpus built from the remaining files.
    SkipFile,
}

// =============================================================================
// Run report
// =============================================================================

/// Terminal state of one file worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Counters produced by a worker that read its file to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Lines decoded from the file.
    pub lines_read: u64,
    /// Lines accepted by the length window.
    pub lines_accepted: u64,
    /// Distinct accepted tokens in the file.
    pub distinct_tokens: u64,
}

/// Outcome of one file, as recorded in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub lines_read: u64,
    pub lines_accepted: u64,
    pub distinct_tokens: u64,
    pub elapsed_ms: u64,
    /// Human-readable failure, when `status` is not `Completed`.
    pub error: Option<String>,
}

impl FileReport {
    pub fn completed(path: PathBuf, stats: FileStats, elapsed_ms: u64) -> Self {
        Self {
            path,
            status: FileStatus::Completed,
            lines_read: stats.lines_read,
            lines_accepted: stats.lines_accepted,
            distinct_tokens: stats.distinct_tokens,
            elapsed_ms,
            error: None,
        }
    }

    pub fn failed(path: PathBuf, status: FileStatus, error: String, elapsed_ms: u64) -> Self {
        Self {
            path,
            status,
            lines_read: 0,
            lines_accepted: 0,
            distinct_tokens: 0,
            elapsed_ms,
            error: Some(error),
        }
    }
}

/// Structured summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub output: PathBuf,
    /// True when an existing, non-empty output artifact was kept and no
    /// files were read.
    pub reused_existing: bool,
    pub window: LengthWindow,
    pub threshold: u64,
    pub counting: CountingMode,
    pub on_error: FailurePolicy,
    pub files: Vec<FileReport>,
    /// Distinct tokens in the tally after fan-in.
    pub distinct_tokens: u64,
    /// Tokens written to the output artifact.
    pub trusted_tokens: u64,
}

impl RunReport {
    /// Number of files that did not complete.
    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status != FileStatus::Completed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_is_eight_to_ten() {
        let window = LengthWindow::default();
        assert_eq!((window.min(), window.max()), (8, 10));
        assert!(window.contains(8));
        assert!(window.contains(10));
        assert!(!window.contains(7));
        assert!(!window.contains(11));
    }

    #[test]
    fn test_window_rejects_inverted_and_empty() {
        assert!(matches!(
            LengthWindow::new(10, 8),
            Err(ConfigError::InvalidWindow { min: 10, max: 8 })
        ));
        assert!(matches!(
            LengthWindow::new(0, 4),
            Err(ConfigError::InvalidWindow { .. })
        ));
        assert!(LengthWindow::new(5, 5).is_ok());
    }

    #[test]
    fn test_window_rejects_oversized_max() {
        let result = LengthWindow::new(1, constants::ABSOLUTE_MAX_TOKEN_LEN + 1);
        assert!(matches!(result, Err(ConfigError::ValueOutOfRange { .. })));
    }

    #[test]
    fn test_deserialized_window_is_validated() {
        let window: LengthWindow = serde_json::from_str(r#"{"min":6,"max":12}"#).unwrap();
        assert_eq!(window, LengthWindow::new(6, 12).unwrap());

        let inverted = serde_json::from_str::<LengthWindow>(r#"{"min":10,"max":8}"#);
        let err = inverted.expect_err("inverted window must not deserialize");
        assert!(err.to_string().contains("[10, 8]"), "{err}");

        assert!(serde_json::from_str::<LengthWindow>(r#"{"min":0,"max":4}"#).is_err());
    }

    #[test]
    fn test_policies_serialise_snake_case() {
        assert_eq!(
            serde_json::to_string(&CountingMode::DistinctFiles).unwrap(),
            "\"distinct_files\""
        );
        assert_eq!(
            serde_json::to_string(&FailurePolicy::SkipFile).unwrap(),
            "\"skip_file\""
        );
    }

    #[test]
    fn test_failed_files_counts_non_completed() {
        let report = RunReport {
            started_at: Utc::now(),
            duration_ms: 0,
            output: PathBuf::from("out.txt"),
            reused_existing: false,
            window: LengthWindow::default(),
            threshold: 2,
            counting: CountingMode::default(),
            on_error: FailurePolicy::SkipFile,
            files: vec![
                FileReport::completed(PathBuf::from("a.gz"), FileStats::default(), 1),
                FileReport::failed(
                    PathBuf::from("b.gz"),
                    FileStatus::Failed,
                    "corrupt".to_string(),
                    1,
                ),
            ],
            distinct_tokens: 0,
            trusted_tokens: 0,
        };
        assert_eq!(report.failed_files(), 1);
    }
}
