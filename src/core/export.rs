// codesift - core/export.rs
//
// Writers for the trusted corpus and the JSON run report.
// Core layer: writes to any Write trait object.

use crate::core::model::RunReport;
use crate::util::constants;
use crate::util::error::OutputError;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one token per line, each followed by `\n`, through a buffered
/// writer. The buffer is flushed before returning.
///
/// Returns the number of tokens written. `path` labels errors only.
pub fn write_corpus<W, I>(tokens: I, writer: W, path: &Path) -> Result<u64, OutputError>
where
    W: Write,
    I: IntoIterator<Item = String>,
{
    let io_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut out = BufWriter::with_capacity(constants::WRITE_BUFFER_BYTES, writer);
    let mut count = 0u64;
    for token in tokens {
        out.write_all(token.as_bytes()).map_err(io_err)?;
        out.write_all(b"\n").map_err(io_err)?;
        count += 1;
    }
    out.flush().map_err(io_err)?;

    Ok(count)
}

/// Export the run report as pretty-printed JSON.
pub fn export_report<W: Write>(
    report: &RunReport,
    mut writer: W,
    path: &Path,
) -> Result<(), OutputError> {
    serde_json::to_writer_pretty(&mut writer, report).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{
        CountingMode, FailurePolicy, FileReport, FileStats, FileStatus, LengthWindow,
    };
    use std::path::PathBuf;

    #[test]
    fn test_write_corpus_one_token_per_line() {
        let mut buf = Vec::new();
        let tokens = vec!["ABCDEFGH".to_string(), "ZZZZZZZZZZ".to_string()];
        let n = write_corpus(tokens, &mut buf, Path::new("out.txt")).unwrap();

        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(buf).unwrap(), "ABCDEFGH\nZZZZZZZZZZ\n");
    }

    #[test]
    fn test_write_corpus_empty() {
        let mut buf = Vec::new();
        let n = write_corpus(Vec::new(), &mut buf, Path::new("out.txt")).unwrap();
        assert_eq!(n, 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_export_report_json() {
        let report = RunReport {
            started_at: chrono::Utc::now(),
            duration_ms: 12,
            output: PathBuf::from("valid_codes.txt"),
            reused_existing: false,
            window: LengthWindow::default(),
            threshold: 2,
            counting: CountingMode::DistinctFiles,
            on_error: FailurePolicy::Abort,
            files: vec![
                FileReport::completed(
                    PathBuf::from("a.gz"),
                    FileStats {
                        lines_read: 4,
                        lines_accepted: 3,
                        distinct_tokens: 2,
                    },
                    5,
                ),
                FileReport::failed(
                    PathBuf::from("b.gz"),
                    FileStatus::Failed,
                    "bad".to_string(),
                    1,
                ),
            ],
            distinct_tokens: 2,
            trusted_tokens: 0,
        };

        let mut buf = Vec::new();
        export_report(&report, &mut buf, Path::new("report.json")).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["threshold"], 2);
        assert_eq!(value["counting"], "distinct_files");
        assert_eq!(value["files"][0]["status"], "completed");
        assert_eq!(value["files"][1]["error"], "bad");
        assert_eq!(value["window"]["min"], 8);
    }
}
