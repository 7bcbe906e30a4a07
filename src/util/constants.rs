// codesift - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every value the pipeline treats as policy lives here so it can be audited
// and overridden through config.toml or the CLI.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "codesift";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "codesift";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Candidate extraction
// =============================================================================

/// Shortest trimmed line (in characters) accepted as a candidate code.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 8;

/// Longest trimmed line (in characters) accepted as a candidate code.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 10;

/// Hard upper bound on either end of the length window.
pub const ABSOLUTE_MAX_TOKEN_LEN: usize = 4_096;

// =============================================================================
// Cross-file tally
// =============================================================================

/// Minimum cross-file occurrence count for a token to be emitted.
pub const DEFAULT_REDUNDANCY_THRESHOLD: u64 = 2;

/// Upper bound for the configurable redundancy threshold.
pub const MAX_REDUNDANCY_THRESHOLD: u64 = 1_024;

/// Minimum number of distinct keys the tally reserves room for up front.
///
/// The orchestrator reserves more when the compressed size of the inputs
/// suggests it (see `COMPRESSED_BYTES_PER_LINE`), up to
/// `MAX_ESTIMATED_TALLY_CAPACITY`. Raise this floor through
/// `[pipeline] tally_capacity` to pre-size beyond the estimate.
pub const DEFAULT_TALLY_CAPACITY: usize = 1 << 16;

/// Rough compressed size of one artifact line. Short alphanumeric codes
/// compress to a handful of bytes each, so dividing the compressed file size
/// by this gives a line count that rarely falls short.
pub const COMPRESSED_BYTES_PER_LINE: u64 = 8;

/// Ceiling for size-based pre-allocation, both for the shared tally and for
/// each worker's per-file table.
pub const MAX_ESTIMATED_TALLY_CAPACITY: usize = 10_000_000;

/// Hard upper bound on the tally pre-allocation.
pub const ABSOLUTE_MAX_TALLY_CAPACITY: usize = 100_000_000;

// =============================================================================
// Reading
// =============================================================================

/// Maximum length of a single decoded line. A longer line is a fatal decode
/// error for the file that contains it.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4 * 1024 * 1024; // 4 MiB

/// Lower bound for the configurable line limit.
pub const MIN_MAX_LINE_BYTES: usize = 1_024;

/// Upper bound for the configurable line limit.
pub const ABSOLUTE_MAX_LINE_BYTES: usize = 256 * 1024 * 1024; // 256 MiB

/// Capacity of the buffered reader wrapped around each decompression stream.
pub const READ_BUFFER_BYTES: usize = 256 * 1024; // 256 KiB

/// Capacity of the buffered writer used for the output artifact.
pub const WRITE_BUFFER_BYTES: usize = 256 * 1024; // 256 KiB

/// A worker checks the cancel flag and its deadline once per this many lines.
pub const CANCEL_CHECK_INTERVAL_LINES: u64 = 4_096;

/// Upper bound for the per-file deadline (seconds).
pub const MAX_FILE_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

// =============================================================================
// Input discovery
// =============================================================================

/// Filename patterns a file inside an input directory must match.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.gz"];

/// Maximum directory recursion depth when an input entry is a directory.
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// Hard upper bound on directory recursion depth.
pub const ABSOLUTE_MAX_DEPTH: usize = 32;

/// Hard upper bound on the number of resolved input files. One worker thread
/// is spawned per file, so this also bounds the fan-out.
pub const ABSOLUTE_MAX_INPUT_FILES: usize = 256;

// =============================================================================
// Output
// =============================================================================

/// Suffix appended to the output path while the artifact is being written.
/// The finished file is renamed over the real path only after a full flush.
pub const PARTIAL_OUTPUT_SUFFIX: &str = ".partial";

/// Whether a run is skipped when the output artifact already holds data.
pub const DEFAULT_REUSE_EXISTING: bool = true;

// =============================================================================
// Logging
// =============================================================================

/// Default log level when neither RUST_LOG nor --debug is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
