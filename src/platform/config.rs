// codesift - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for codesift configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/codesift/ or %APPDATA%\codesift\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Location of the default config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[input]` section.
    pub input: InputSection,
    /// `[output]` section.
    pub output: OutputSection,
    /// `[filter]` section.
    pub filter: FilterSection,
    /// `[pipeline]` section.
    pub pipeline: PipelineSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[input]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct InputSection {
    /// Artifact files, directories, or glob patterns.
    pub artifacts: Option<Vec<String>>,
    /// Filename patterns applied inside directory entries.
    pub include_patterns: Option<Vec<String>>,
    /// Recursion depth for directory entries.
    pub max_depth: Option<usize>,
}

/// `[output]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Trusted corpus path.
    pub path: Option<String>,
    /// Keep an existing, non-empty corpus instead of rebuilding it.
    pub reuse_existing: Option<bool>,
    /// Optional JSON run report path.
    pub report: Option<String>,
}

/// `[filter]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct FilterSection {
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    /// Minimum cross-file count.
    pub threshold: Option<u64>,
    /// "files" (default) or "lines".
    pub count: Option<String>,
}

/// `[pipeline]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// "abort" (default) or "skip".
    pub on_error: Option<String>,
    pub max_line_bytes: Option<usize>,
    pub tally_capacity: Option<usize>,
    pub file_timeout_secs: Option<u64>,
    pub max_workers: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// All values are validated against named constants at load time.
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Input --
    pub artifacts: Vec<String>,
    pub include_patterns: Vec<String>,
    pub max_depth: usize,

    // -- Output --
    pub output: Option<PathBuf>,
    pub reuse_existing: bool,
    pub report: Option<PathBuf>,

    // -- Filter --
    pub min_len: usize,
    pub max_len: usize,
    pub threshold: u64,
    /// Count every accepted line instead of every distinct file.
    pub count_lines: bool,

    // -- Pipeline --
    /// Drop failed files instead of aborting the run.
    pub skip_failed_files: bool,
    pub max_line_bytes: usize,
    pub tally_capacity: usize,
    pub file_timeout_secs: Option<u64>,
    pub max_workers: Option<usize>,

    // -- Logging --
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: Vec::new(),
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            output: None,
            reuse_existing: constants::DEFAULT_REUSE_EXISTING,
            report: None,
            min_len: constants::DEFAULT_MIN_TOKEN_LEN,
            max_len: constants::DEFAULT_MAX_TOKEN_LEN,
            threshold: constants::DEFAULT_REDUNDANCY_THRESHOLD,
            count_lines: false,
            skip_failed_files: false,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
            tally_capacity: constants::DEFAULT_TALLY_CAPACITY,
            file_timeout_secs: None,
            max_workers: None,
            log_level: None,
        }
    }
}

/// Load and validate an explicitly requested config file.
///
/// A missing, unreadable, or unparseable file is an error: the caller asked
/// for this file by name. Out-of-range values are returned as warnings and
/// replaced by defaults.
pub fn load_config_file(path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (config, warnings) = parse_config(&content, path)?;
    tracing::info!(path = %path.display(), "Loaded config file");
    Ok((config, warnings))
}

/// Load the platform default config.toml if present.
///
/// If the file does not exist, returns defaults with no warnings (first run).
/// If it cannot be read or parsed, returns defaults with a warning so the
/// user is informed without the run being blocked by an unrelated file.
pub fn load_default_config(paths: &PlatformPaths) -> (AppConfig, Vec<String>) {
    let config_path = paths.config_file();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match load_config_file(&config_path) {
        Ok(result) => result,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Parse and validate config.toml content. `path` labels messages only.
pub fn parse_config(content: &str, path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;

    // Validate each field against named constants, accumulating all warnings.
    let mut config = AppConfig::default();
    let mut warnings: Vec<String> = Vec::new();

    // -- Input --
    if let Some(artifacts) = raw.input.artifacts {
        config.artifacts = artifacts;
    }
    if let Some(patterns) = raw.input.include_patterns {
        config.include_patterns = patterns;
    }
    if let Some(depth) = raw.input.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            warnings.push(format!(
                "[input] max_depth = {depth} is out of range (1-{}). Using default ({}).",
                constants::ABSOLUTE_MAX_DEPTH,
                constants::DEFAULT_MAX_DEPTH,
            ));
        }
    }

    // -- Output --
    if let Some(path) = raw.output.path.filter(|p| !p.is_empty()) {
        config.output = Some(PathBuf::from(path));
    }
    if let Some(reuse) = raw.output.reuse_existing {
        config.reuse_existing = reuse;
    }
    if let Some(report) = raw.output.report.filter(|p| !p.is_empty()) {
        config.report = Some(PathBuf::from(report));
    }

    // -- Filter: length window --
    let min_len = raw.filter.min_len.unwrap_or(config.min_len);
    let max_len = raw.filter.max_len.unwrap_or(config.max_len);
    if min_len >= 1 && min_len <= max_len && max_len <= constants::ABSOLUTE_MAX_TOKEN_LEN {
        config.min_len = min_len;
        config.max_len = max_len;
    } else {
        warnings.push(format!(
            "[filter] min_len = {min_len}, max_len = {max_len} is not a valid window \
             (1 <= min_len <= max_len <= {}). Using default ([{}, {}]).",
            constants::ABSOLUTE_MAX_TOKEN_LEN,
            constants::DEFAULT_MIN_TOKEN_LEN,
            constants::DEFAULT_MAX_TOKEN_LEN,
        ));
    }

    // -- Filter: threshold --
    if let Some(threshold) = raw.filter.threshold {
        if (1..=constants::MAX_REDUNDANCY_THRESHOLD).contains(&threshold) {
            config.threshold = threshold;
        } else {
            warnings.push(format!(
                "[filter] threshold = {threshold} is out of range (1-{}). Using default ({}).",
                constants::MAX_REDUNDANCY_THRESHOLD,
                constants::DEFAULT_REDUNDANCY_THRESHOLD,
            ));
        }
    }

    // -- Filter: counting mode --
    if let Some(ref count) = raw.filter.count {
        match count.to_lowercase().as_str() {
            "files" => config.count_lines = false,
            "lines" => config.count_lines = true,
            other => warnings.push(format!(
                "[filter] count = \"{other}\" is not recognised. \
                 Expected \"files\" or \"lines\". Using default (files).",
            )),
        }
    }

    // -- Pipeline: failure policy --
    if let Some(ref policy) = raw.pipeline.on_error {
        match policy.to_lowercase().as_str() {
            "abort" => config.skip_failed_files = false,
            "skip" => config.skip_failed_files = true,
            other => warnings.push(format!(
                "[pipeline] on_error = \"{other}\" is not recognised. \
                 Expected \"abort\" or \"skip\". Using default (abort).",
            )),
        }
    }

    // -- Pipeline: max_line_bytes --
    if let Some(bytes) = raw.pipeline.max_line_bytes {
        if (constants::MIN_MAX_LINE_BYTES..=constants::ABSOLUTE_MAX_LINE_BYTES).contains(&bytes) {
            config.max_line_bytes = bytes;
        } else {
            warnings.push(format!(
                "[pipeline] max_line_bytes = {bytes} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_LINE_BYTES,
                constants::ABSOLUTE_MAX_LINE_BYTES,
                constants::DEFAULT_MAX_LINE_BYTES,
            ));
        }
    }

    // -- Pipeline: tally_capacity --
    if let Some(capacity) = raw.pipeline.tally_capacity {
        if capacity <= constants::ABSOLUTE_MAX_TALLY_CAPACITY {
            config.tally_capacity = capacity;
        } else {
            warnings.push(format!(
                "[pipeline] tally_capacity = {capacity} exceeds maximum ({}). Using default ({}).",
                constants::ABSOLUTE_MAX_TALLY_CAPACITY,
                constants::DEFAULT_TALLY_CAPACITY,
            ));
        }
    }

    // -- Pipeline: file_timeout_secs (0 = no deadline) --
    if let Some(secs) = raw.pipeline.file_timeout_secs {
        if secs == 0 {
            config.file_timeout_secs = None;
        } else if secs <= constants::MAX_FILE_TIMEOUT_SECS {
            config.file_timeout_secs = Some(secs);
        } else {
            warnings.push(format!(
                "[pipeline] file_timeout_secs = {secs} is out of range (0-{}). Using no deadline.",
                constants::MAX_FILE_TIMEOUT_SECS,
            ));
        }
    }

    // -- Pipeline: max_workers (0 = one per file) --
    if let Some(workers) = raw.pipeline.max_workers {
        if workers == 0 {
            config.max_workers = None;
        } else if workers <= constants::ABSOLUTE_MAX_INPUT_FILES {
            config.max_workers = Some(workers);
        } else {
            warnings.push(format!(
                "[pipeline] max_workers = {workers} is out of range (0-{}). Using one per file.",
                constants::ABSOLUTE_MAX_INPUT_FILES,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    Ok((config, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (AppConfig, Vec<String>) {
        parse_config(content, Path::new("config.toml")).expect("parse")
    }

    #[test]
    fn test_empty_config_is_defaults() {
        let (config, warnings) = parse("");
        assert!(warnings.is_empty());
        assert!(config.artifacts.is_empty());
        assert_eq!(config.min_len, constants::DEFAULT_MIN_TOKEN_LEN);
        assert_eq!(config.max_len, constants::DEFAULT_MAX_TOKEN_LEN);
        assert_eq!(config.threshold, constants::DEFAULT_REDUNDANCY_THRESHOLD);
        assert!(!config.count_lines);
        assert!(!config.skip_failed_files);
    }

    #[test]
    fn test_full_config() {
        let (config, warnings) = parse(
            r#"
            [input]
            artifacts = ["data/couponbase1.gz", "data/couponbase2.gz"]

            [output]
            path = "token/valid_codes.txt"
            reuse_existing = false
            report = "token/report.json"

            [filter]
            min_len = 6
            max_len = 12
            threshold = 3
            count = "lines"

            [pipeline]
            on_error = "skip"
            max_line_bytes = 8388608
            tally_capacity = 10000000
            file_timeout_secs = 600
            max_workers = 2

            [logging]
            level = "debug"
            "#,
        );

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.artifacts.len(), 2);
        assert_eq!(config.output, Some(PathBuf::from("token/valid_codes.txt")));
        assert!(!config.reuse_existing);
        assert_eq!(config.report, Some(PathBuf::from("token/report.json")));
        assert_eq!((config.min_len, config.max_len), (6, 12));
        assert_eq!(config.threshold, 3);
        assert!(config.count_lines);
        assert!(config.skip_failed_files);
        assert_eq!(config.max_line_bytes, 8 * 1024 * 1024);
        assert_eq!(config.tally_capacity, 10_000_000);
        assert_eq!(config.file_timeout_secs, Some(600));
        assert_eq!(config.max_workers, Some(2));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_fall_back() {
        let (config, warnings) = parse(
            r#"
            [filter]
            min_len = 12
            max_len = 6
            threshold = 0
            count = "bytes"

            [pipeline]
            on_error = "ignore"
            max_line_bytes = 1
            "#,
        );

        assert_eq!(warnings.len(), 5, "{warnings:?}");
        assert_eq!(config.min_len, constants::DEFAULT_MIN_TOKEN_LEN);
        assert_eq!(config.max_len, constants::DEFAULT_MAX_TOKEN_LEN);
        assert_eq!(config.threshold, constants::DEFAULT_REDUNDANCY_THRESHOLD);
        assert!(!config.count_lines);
        assert!(!config.skip_failed_files);
        assert_eq!(config.max_line_bytes, constants::DEFAULT_MAX_LINE_BYTES);
    }

    #[test]
    fn test_zero_means_unset_for_timeout_and_workers() {
        let (config, warnings) = parse(
            r#"
            [pipeline]
            file_timeout_secs = 0
            max_workers = 0
            "#,
        );
        assert!(warnings.is_empty());
        assert_eq!(config.file_timeout_secs, None);
        assert_eq!(config.max_workers, None);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (_, warnings) = parse(
            r#"
            [future]
            shiny = true
            "#,
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let result = parse_config("[filter\nmin_len = ", Path::new("bad.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
    }

    #[test]
    fn test_load_config_file_missing_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_config_file(&dir.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_default_config_falls_back_on_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(constants::CONFIG_FILE_NAME), "not = [valid").unwrap();
        let paths = PlatformPaths {
            config_dir: dir.path().to_path_buf(),
        };

        let (config, warnings) = load_default_config(&paths);
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.threshold, constants::DEFAULT_REDUNDANCY_THRESHOLD);
    }

    #[test]
    fn test_load_default_config_absent_is_silent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = PlatformPaths {
            config_dir: dir.path().to_path_buf(),
        };
        let (_, warnings) = load_default_config(&paths);
        assert!(warnings.is_empty());
    }
}
