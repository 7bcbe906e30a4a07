// codesift - core/reader.rs
//
// Bounded line reader over any buffered byte stream.
// Core layer: accepts BufRead implementors, never touches the filesystem
// directly. The platform layer wraps a gzip stream and hands it in here.
//
// Every line is read through a `take` limit, so a pathological line can
// never grow the buffer past `max_line_bytes` plus its terminator.

use crate::util::error::ReaderError;
use std::borrow::Cow;
use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

/// Lazy, forward-only sequence of decoded lines.
///
/// Restartable only by reopening the source. Once an error has been
/// returned the reader is exhausted.
pub struct LineReader<R> {
    inner: R,
    path: PathBuf,
    max_line_bytes: usize,
    line_number: u64,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> LineReader<R> {
    /// Wrap `inner`. `path` is only used to label errors.
    pub fn new(inner: R, path: &Path, max_line_bytes: usize) -> Self {
        Self {
            inner,
            path: path.to_path_buf(),
            max_line_bytes,
            line_number: 0,
            buf: Vec::new(),
            finished: false,
        }
    }

    /// Number of lines returned so far.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read the next line without its `\n` / `\r\n` terminator.
    ///
    /// Returns `Ok(None)` at end of stream. Invalid UTF-8 is replaced rather
    /// than rejected; the returned text borrows the reader's buffer when the
    /// line is already valid.
    pub fn next_line(&mut self) -> Result<Option<Cow<'_, str>>, ReaderError> {
        if self.finished {
            return Ok(None);
        }

        self.buf.clear();
        // Room for the longest permitted line plus "\r\n".
        let limit = self.max_line_bytes as u64 + 2;
        let read = match self.inner.by_ref().take(limit).read_until(b'\n', &mut self.buf) {
            Ok(n) => n,
            Err(source) => {
                self.finished = true;
                return Err(ReaderError::Decode {
                    path: self.path.clone(),
                    line_number: self.line_number + 1,
                    source,
                });
            }
        };

        if read == 0 {
            self.finished = true;
            return Ok(None);
        }

        self.line_number += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        if self.buf.len() > self.max_line_bytes {
            self.finished = true;
            return Err(ReaderError::LineTooLong {
                path: self.path.clone(),
                line_number: self.line_number,
                max_bytes: self.max_line_bytes,
            });
        }

        Ok(Some(String::from_utf8_lossy(&self.buf)))
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = Result<String, ReaderError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line.into_owned())),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
