// codesift - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every variant carries the path or value
// it concerns and keeps the underlying cause reachable through `source()`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all codesift operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum CodeSiftError {
    /// Reading or decoding an artifact file failed.
    Reader(ReaderError),

    /// Resolving the input artifact list failed.
    Discovery(DiscoveryError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// Writing the output artifact failed.
    Output(OutputError),

    /// The orchestrator itself failed.
    Pipeline(PipelineError),
}

impl fmt::Display for CodeSiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reader(e) => write!(f, "Read error: {e}"),
            Self::Discovery(e) => write!(f, "Input error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Output(e) => write!(f, "Output error: {e}"),
            Self::Pipeline(e) => write!(f, "Pipeline error: {e}"),
        }
    }
}

impl std::error::Error for CodeSiftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reader(e) => Some(e),
            Self::Discovery(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Output(e) => Some(e),
            Self::Pipeline(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Reader errors
// ---------------------------------------------------------------------------

/// Errors raised while streaming one artifact file. Every variant is fatal
/// for the file it names.
#[derive(Debug)]
pub enum ReaderError {
    /// The file could not be opened.
    Open { path: PathBuf, source: io::Error },

    /// The gzip stream could not be initialised (bad or truncated header).
    DecoderInit { path: PathBuf, source: io::Error },

    /// Decompression or reading failed part-way through the file.
    Decode {
        path: PathBuf,
        line_number: u64,
        source: io::Error,
    },

    /// A decoded line exceeded the configured maximum length.
    LineTooLong {
        path: PathBuf,
        line_number: u64,
        max_bytes: usize,
    },

    /// The worker was asked to stop before finishing the file.
    Cancelled { path: PathBuf },

    /// The file was not finished within its deadline.
    DeadlineExceeded { path: PathBuf, limit: Duration },
}

impl ReaderError {
    /// Path of the artifact file this error concerns.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Open { path, .. }
            | Self::DecoderInit { path, .. }
            | Self::Decode { path, .. }
            | Self::LineTooLong { path, .. }
            | Self::Cancelled { path }
            | Self::DeadlineExceeded { path, .. } => path,
        }
    }

    /// True when the error is a consequence of cancellation rather than a
    /// problem with the file itself.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "Cannot open '{}': {source}", path.display())
            }
            Self::DecoderInit { path, source } => {
                write!(
                    f,
                    "'{}' is not a readable gzip stream: {source}",
                    path.display()
                )
            }
            Self::Decode {
                path,
                line_number,
                source,
            } => write!(
                f,
                "'{}' line {line_number}: decompression failed: {source}",
                path.display()
            ),
            Self::LineTooLong {
                path,
                line_number,
                max_bytes,
            } => write!(
                f,
                "'{}' line {line_number}: line exceeds maximum of {max_bytes} bytes",
                path.display()
            ),
            Self::Cancelled { path } => {
                write!(f, "'{}': processing cancelled", path.display())
            }
            Self::DeadlineExceeded { path, limit } => write!(
                f,
                "'{}': not finished within {}s",
                path.display(),
                limit.as_secs()
            ),
        }
    }
}

impl std::error::Error for ReaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::DecoderInit { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ReaderError> for CodeSiftError {
    fn from(e: ReaderError) -> Self {
        Self::Reader(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to resolving the configured input entries into files.
#[derive(Debug)]
pub enum DiscoveryError {
    /// No input entries were configured, or none resolved to a file.
    NoInputs,

    /// A literal input path does not exist.
    NotFound { path: PathBuf },

    /// A glob pattern entry matched no files.
    NoMatches { pattern: String },

    /// An input entry looked like a glob pattern but failed to compile.
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    /// Walking an input directory failed.
    Traversal {
        path: PathBuf,
        source: walkdir::Error,
    },

    /// An existing input path could not be resolved to its canonical form.
    Resolve { path: PathBuf, source: io::Error },

    /// More input files resolved than one run may fan out over.
    TooManyInputs { count: usize, max: usize },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInputs => write!(f, "No input artifact files to process"),
            Self::NotFound { path } => {
                write!(f, "Input '{}' does not exist", path.display())
            }
            Self::NoMatches { pattern } => {
                write!(f, "Input pattern '{pattern}' matched no files")
            }
            Self::InvalidPattern { pattern, source } => {
                write!(f, "Invalid input pattern '{pattern}': {source}")
            }
            Self::Traversal { path, source } => {
                write!(f, "Error traversing '{}': {source}", path.display())
            }
            Self::Resolve { path, source } => {
                write!(f, "Cannot resolve input '{}': {source}", path.display())
            }
            Self::TooManyInputs { count, max } => write!(
                f,
                "{count} input files resolved, maximum is {max}. \
                 Narrow the input patterns or split the run."
            ),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
            Self::Traversal { source, .. } => Some(source),
            Self::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for CodeSiftError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// The token length window is empty or inverted.
    InvalidWindow { min: usize, max: usize },

    /// No output path was configured.
    MissingOutput,

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::InvalidWindow { min, max } => write!(
                f,
                "Token length window [{min}, {max}] is invalid. \
                 Expected 1 <= min_len <= max_len."
            ),
            Self::MissingOutput => write!(
                f,
                "No output path configured. Pass --output or set [output] path."
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for CodeSiftError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Output errors
// ---------------------------------------------------------------------------

/// Errors related to writing the output artifact.
#[derive(Debug)]
pub enum OutputError {
    /// The temporary output file could not be created.
    Create { path: PathBuf, source: io::Error },

    /// Writing or flushing the artifact failed.
    Write { path: PathBuf, source: io::Error },

    /// The finished artifact could not be moved into place.
    Persist { path: PathBuf, source: io::Error },

    /// JSON serialisation of the run report failed.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { path, source } => {
                write!(f, "Cannot create '{}': {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "Cannot write '{}': {source}", path.display())
            }
            Self::Persist { path, source } => {
                write!(f, "Cannot move output into '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "Report export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create { source, .. } => Some(source),
            Self::Write { source, .. } => Some(source),
            Self::Persist { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<OutputError> for CodeSiftError {
    fn from(e: OutputError) -> Self {
        Self::Output(e)
    }
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Errors raised by the orchestrator rather than by an individual file.
#[derive(Debug)]
pub enum PipelineError {
    /// The worker thread pool could not be built.
    ThreadPool {
        workers: usize,
        source: rayon::ThreadPoolBuildError,
    },

    /// The run was cancelled through an external cancel flag.
    Cancelled,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadPool { workers, source } => {
                write!(f, "Cannot start {workers} worker threads: {source}")
            }
            Self::Cancelled => write!(f, "Run cancelled before completion"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ThreadPool { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PipelineError> for CodeSiftError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

/// Convenience type alias for codesift results.
pub type Result<T> = std::result::Result<T, CodeSiftError>;
