// codesift - core/discovery.rs
//
// Resolution of configured input entries into concrete artifact files.
//
// An entry is one of:
//   - a literal file path, used as-is;
//   - a directory, walked with `walkdir` for files matching the include
//     patterns (default `*.gz`);
//   - a glob pattern (contains `*`, `?` or `[` and names no existing path),
//     expanded with `glob`.
//
// Every resolved file is stored under its canonical path, so two spellings
// of one physical file (`a.gz`, `sub/../a.gz`, a symlink) count as one input.
//
// Errors on individual entries below a root are non-fatal and collected as
// warnings. A literal path that does not exist, or a pattern that matches
// nothing, is fatal: the artifact list is configuration, and silently
// dropping a file would change which tokens are considered redundant.

use crate::util::constants;
use crate::util::error::DiscoveryError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for input resolution.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Filename glob patterns a file inside an input directory must match.
    /// An empty list means "every file".
    pub include_patterns: Vec<String>,

    /// Maximum directory recursion depth for directory entries.
    pub max_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_depth: constants::DEFAULT_MAX_DEPTH,
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolve `entries` into a sorted list of distinct files, each given by its
/// canonical path.
///
/// Returns the files and a list of human-readable, non-fatal warnings.
pub fn resolve_inputs(
    entries: &[String],
    config: &DiscoveryConfig,
) -> Result<(Vec<PathBuf>, Vec<String>), DiscoveryError> {
    let include_pats = compile_patterns(&config.include_patterns);

    let mut files: BTreeSet<PathBuf> = BTreeSet::new();
    let mut warnings: Vec<String> = Vec::new();

    for entry in entries {
        let path = Path::new(entry);

        // An existing name wins over pattern syntax: `codes[1].gz` is a file.
        if !path.exists() && is_glob(entry) {
            expand_glob(entry, &mut files, &mut warnings)?;
            continue;
        }

        if path.is_dir() {
            walk_directory(path, config.max_depth, &include_pats, &mut files, &mut warnings)?;
        } else if path.is_file() {
            let canonical = path.canonicalize().map_err(|source| DiscoveryError::Resolve {
                path: path.to_path_buf(),
                source,
            })?;
            files.insert(canonical);
        } else {
            return Err(DiscoveryError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }

    if files.is_empty() {
        return Err(DiscoveryError::NoInputs);
    }
    if files.len() > constants::ABSOLUTE_MAX_INPUT_FILES {
        return Err(DiscoveryError::TooManyInputs {
            count: files.len(),
            max: constants::ABSOLUTE_MAX_INPUT_FILES,
        });
    }

    tracing::debug!(
        entries = entries.len(),
        files = files.len(),
        warnings = warnings.len(),
        "Inputs resolved"
    );

    Ok((files.into_iter().collect(), warnings))
}

fn is_glob(entry: &str) -> bool {
    entry.chars().any(|c| matches!(c, '*' | '?' | '['))
}

/// Insert a file found below a directory or by a pattern under its canonical
/// path. A file that cannot be resolved is skipped with a warning.
fn insert_found(path: PathBuf, files: &mut BTreeSet<PathBuf>, warnings: &mut Vec<String>) {
    match path.canonicalize() {
        Ok(canonical) => {
            files.insert(canonical);
        }
        Err(e) => {
            let msg = format!("Cannot resolve '{}': {e}", path.display());
            tracing::debug!(warning = %msg, "Discovery warning");
            warnings.push(msg);
        }
    }
}

fn expand_glob(
    pattern: &str,
    files: &mut BTreeSet<PathBuf>,
    warnings: &mut Vec<String>,
) -> Result<(), DiscoveryError> {
    let paths = glob::glob(pattern).map_err(|source| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matched = 0usize;
    for result in paths {
        match result {
            Ok(path) if path.is_file() => {
                matched += 1;
                insert_found(path, files, warnings);
            }
            Ok(_) => {}
            Err(e) => {
                let msg = format!("Cannot access '{}': {}", e.path().display(), e.error());
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
            }
        }
    }

    if matched == 0 {
        return Err(DiscoveryError::NoMatches {
            pattern: pattern.to_string(),
        });
    }
    Ok(())
}

fn walk_directory(
    root: &Path,
    max_depth: usize,
    include_pats: &[glob::Pattern],
    files: &mut BTreeSet<PathBuf>,
    warnings: &mut Vec<String>,
) -> Result<(), DiscoveryError> {
    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            // The root itself being unreadable is fatal; anything below it
            // is recorded and skipped.
            Err(e) if e.depth() == 0 => {
                return Err(DiscoveryError::Traversal {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                warnings.push(msg);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = match entry.file_name().to_str() {
            Some(n) => n,
            None => {
                warnings.push(format!(
                    "Skipping '{}': non-UTF-8 filename",
                    entry.path().display()
                ));
                continue;
            }
        };

        if !is_included(file_name, include_pats) {
            tracing::trace!(file = file_name, "Not matched by include patterns");
            continue;
        }

        insert_found(entry.into_path(), files, warnings);
    }

    Ok(())
}

// =============================================================================
// Glob helpers
// =============================================================================

/// Compile a list of glob pattern strings into `glob::Pattern` objects.
/// Patterns that fail to compile are logged as warnings and skipped.
fn compile_patterns(patterns: &[String]) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, error = %e, "Invalid include pattern, skipping");
                None
            }
        })
        .collect()
}

/// Returns true if `file_name` matches at least one include pattern.
/// An empty include list means "include all".
fn is_included(file_name: &str, include_pats: &[glob::Pattern]) -> bool {
    include_pats.is_empty() || include_pats.iter().any(|p| p.matches(file_name))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_temp_tree() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        fs::write(root.join("couponbase1.gz"), b"x").expect("write 1");
        fs::write(root.join("couponbase2.gz"), b"x").expect("write 2");
        fs::write(root.join("notes.txt"), b"x").expect("write notes");

        let sub = root.join("more");
        fs::create_dir(&sub).expect("mkdir more");
        fs::write(sub.join("couponbase3.gz"), b"x").expect("write 3");

        dir
    }

    /// Canonical root of the temp tree; resolved paths are reported in this form.
    fn root(dir: &TempDir) -> PathBuf {
        dir.path().canonicalize().expect("canonical root")
    }

    fn as_strings(dir: &TempDir, rel: &[&str]) -> Vec<String> {
        rel.iter()
            .map(|r| dir.path().join(r).to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_directory_entry_walks_gz_files() {
        let dir = make_temp_tree();
        let entries = vec![dir.path().to_string_lossy().into_owned()];

        let (files, warnings) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 3, "{names:?}");
        assert!(!names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_literal_files_are_deduplicated_and_sorted() {
        let dir = make_temp_tree();
        let entries = as_strings(&dir, &["couponbase2.gz", "couponbase1.gz", "couponbase2.gz"]);

        let (files, _) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();

        let root = root(&dir);
        assert_eq!(
            files,
            vec![root.join("couponbase1.gz"), root.join("couponbase2.gz")]
        );
    }

    #[test]
    fn test_literal_file_ignores_include_patterns() {
        let dir = make_temp_tree();
        let entries = as_strings(&dir, &["notes.txt"]);
        let (files, _) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();
        assert_eq!(files, vec![root(&dir).join("notes.txt")]);
    }

    #[test]
    fn test_glob_entry_expands() {
        let dir = make_temp_tree();
        let pattern = dir.path().join("couponbase*.gz").to_string_lossy().into_owned();

        let (files, warnings) = resolve_inputs(&[pattern], &DiscoveryConfig::default()).unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_glob_without_matches_is_fatal() {
        let dir = make_temp_tree();
        let entries = vec![
            dir.path().join("couponbase1.gz").to_string_lossy().into_owned(),
            dir.path().join("*.zst").to_string_lossy().into_owned(),
        ];

        let result = resolve_inputs(&entries, &DiscoveryConfig::default());
        assert!(
            matches!(result, Err(DiscoveryError::NoMatches { .. })),
            "expected NoMatches, got {result:?}"
        );
    }

    #[test]
    fn test_existing_name_with_brackets_is_literal() {
        let dir = make_temp_tree();
        fs::write(dir.path().join("codes[1].gz"), b"x").expect("write");
        let entries = as_strings(&dir, &["codes[1].gz"]);

        let (files, warnings) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();

        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(files, vec![root(&dir).join("codes[1].gz")]);
    }

    #[test]
    fn test_missing_name_with_brackets_is_fatal() {
        let dir = make_temp_tree();
        let entries = as_strings(&dir, &["codes[9].gz"]);
        let result = resolve_inputs(&entries, &DiscoveryConfig::default());
        assert!(matches!(result, Err(DiscoveryError::NoMatches { .. })));
    }

    #[test]
    fn test_two_spellings_of_one_file_resolve_once() {
        let dir = make_temp_tree();
        let entries = vec![
            dir.path().join("couponbase1.gz").to_string_lossy().into_owned(),
            dir.path()
                .join("more")
                .join("..")
                .join("couponbase1.gz")
                .to_string_lossy()
                .into_owned(),
            dir.path().join("couponbase1*").to_string_lossy().into_owned(),
        ];

        let (files, _) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();
        assert_eq!(files, vec![root(&dir).join("couponbase1.gz")]);
    }

    #[test]
    fn test_directory_walk_and_literal_overlap_once() {
        let dir = make_temp_tree();
        let entries = vec![
            dir.path().join("more").to_string_lossy().into_owned(),
            dir.path()
                .join("more")
                .join(".")
                .join("couponbase3.gz")
                .to_string_lossy()
                .into_owned(),
        ];

        let (files, _) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();
        assert_eq!(files, vec![root(&dir).join("more").join("couponbase3.gz")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_resolves_to_its_target() {
        let dir = make_temp_tree();
        std::os::unix::fs::symlink(
            dir.path().join("couponbase1.gz"),
            dir.path().join("alias.gz"),
        )
        .expect("symlink");
        let entries = as_strings(&dir, &["couponbase1.gz", "alias.gz"]);

        let (files, _) = resolve_inputs(&entries, &DiscoveryConfig::default()).unwrap();
        assert_eq!(files, vec![root(&dir).join("couponbase1.gz")]);
    }

    #[test]
    fn test_missing_literal_is_fatal() {
        let dir = make_temp_tree();
        let entries = as_strings(&dir, &["couponbase1.gz", "missing.gz"]);
        let result = resolve_inputs(&entries, &DiscoveryConfig::default());
        assert!(
            matches!(result, Err(DiscoveryError::NotFound { .. })),
            "expected NotFound, got {result:?}"
        );
    }

    #[test]
    fn test_no_entries_is_fatal() {
        let result = resolve_inputs(&[], &DiscoveryConfig::default());
        assert!(matches!(result, Err(DiscoveryError::NoInputs)));
    }

    #[test]
    fn test_max_depth_limits_walk() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig {
            max_depth: 1,
            ..Default::default()
        };
        let entries = vec![dir.path().to_string_lossy().into_owned()];
        let (files, _) = resolve_inputs(&entries, &config).unwrap();
        assert_eq!(files.len(), 2);
    }
}
