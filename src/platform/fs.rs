// codesift - platform/fs.rs
//
// Filesystem access for the pipeline: opening gzip artifacts as line
// readers and writing the output artifact atomically.

use crate::core::reader::LineReader;
use crate::util::constants;
use crate::util::error::{OutputError, ReaderError};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// First two bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Line reader over one gzip-compressed artifact file.
///
/// Owns the file handle and the decompression stream; both are released
/// when the reader is dropped, whether or not it was read to the end.
pub type ArtifactLines = LineReader<BufReader<MultiGzDecoder<BufReader<File>>>>;

/// Open a gzip artifact for line-by-line reading.
///
/// Only the gzip magic bytes are checked here: a file that is not gzip at all
/// (or is empty) fails with `DecoderInit`. Nothing is decompressed until the
/// first line is requested, so a damaged header or deflate stream surfaces as
/// `Decode` on that line.
pub fn open_artifact(path: &Path, max_line_bytes: usize) -> Result<ArtifactLines, ReaderError> {
    let file = File::open(path).map_err(|source| ReaderError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut raw = BufReader::with_capacity(constants::READ_BUFFER_BYTES, file);
    let head = raw.fill_buf().map_err(|source| ReaderError::DecoderInit {
        path: path.to_path_buf(),
        source,
    })?;
    if !head.starts_with(&GZIP_MAGIC) {
        return Err(ReaderError::DecoderInit {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "missing gzip magic bytes"),
        });
    }

    let decoder = MultiGzDecoder::new(raw);
    let buffered = BufReader::with_capacity(constants::READ_BUFFER_BYTES, decoder);

    tracing::trace!(file = %path.display(), "Artifact opened");
    Ok(LineReader::new(buffered, path, max_line_bytes))
}

/// Size of `path` in bytes, or 0 if it cannot be read.
pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map_or(0, |m| m.len())
}

/// True if `path` exists and holds at least one byte.
pub fn has_content(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Path of the temporary sibling used while `path` is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(constants::PARTIAL_OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// Write `path` through a temporary sibling and move it into place only after
/// `write` has returned successfully.
///
/// On any failure the temporary file is removed and `path` is left exactly
/// as it was, so an existing artifact always reflects a complete run.
pub fn write_atomically<T, F>(path: &Path, write: F) -> Result<T, OutputError>
where
    F: FnOnce(&mut File) -> Result<T, OutputError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| OutputError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let tmp = partial_path(path);
    let mut file = File::create(&tmp).map_err(|source| OutputError::Create {
        path: tmp.clone(),
        source,
    })?;

    let result = write(&mut file).and_then(|value| {
        file.sync_all().map_err(|source| OutputError::Write {
            path: tmp.clone(),
            source,
        })?;
        Ok(value)
    });
    drop(file);

    let value = match result {
        Ok(value) => value,
        Err(e) => {
            discard_partial(&tmp);
            return Err(e);
        }
    };

    if let Err(source) = std::fs::rename(&tmp, path) {
        discard_partial(&tmp);
        return Err(OutputError::Persist {
            path: path.to_path_buf(),
            source,
        });
    }

    tracing::debug!(output = %path.display(), "Output artifact persisted");
    Ok(value)
}

fn discard_partial(tmp: &Path) {
    match std::fs::remove_file(tmp) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            file = %tmp.display(),
            error = %e,
            "Failed to remove partial output"
        ),
    }
}
