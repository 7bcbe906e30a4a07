// codesift - app/worker.rs
//
// File worker: drives one artifact through reader -> extractor -> tally.
//
// A worker never touches the shared tally until its file has been read to
// completion. Until then its contribution lives in a private per-file table,
// so a file that fails part-way contributes nothing and the orchestrator can
// drop it without leaving half its tokens behind.

use crate::core::extract::extract;
use crate::core::model::{CountingMode, FileStats, LengthWindow};
use crate::core::tally::{self, Tally};
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::ReaderError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Everything a worker shares with its siblings, plus per-run policy.
#[derive(Debug)]
pub struct WorkerContext<'a> {
    pub tally: &'a Tally,
    pub window: LengthWindow,
    pub counting: CountingMode,
    pub max_line_bytes: usize,
    /// Optional per-file deadline.
    pub file_timeout: Option<Duration>,
    /// Set by the orchestrator when the run is being aborted.
    pub abort: &'a AtomicBool,
    /// Optional caller-owned cancel flag.
    pub cancel: Option<&'a AtomicBool>,
}

impl WorkerContext<'_> {
    fn is_cancelled(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
            || self.cancel.is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Cooperative stop point: cancellation first, then the deadline.
    fn checkpoint(&self, path: &Path, started: Instant) -> Result<(), ReaderError> {
        if self.is_cancelled() {
            return Err(ReaderError::Cancelled {
                path: path.to_path_buf(),
            });
        }
        if let Some(limit) = self.file_timeout {
            if started.elapsed() > limit {
                return Err(ReaderError::DeadlineExceeded {
                    path: path.to_path_buf(),
                    limit,
                });
            }
        }
        Ok(())
    }
}

/// Process one artifact file and commit its tokens to the shared tally.
///
/// Any error is fatal for this file only; what that means for the run is
/// decided by the orchestrator.
pub fn process_file(path: &Path, ctx: &WorkerContext<'_>) -> Result<FileStats, ReaderError> {
    let started = Instant::now();
    ctx.checkpoint(path, started)?;

    let mut reader = fs::open_artifact(path, ctx.max_line_bytes)?;
    let mut local: HashMap<String, u64> =
        HashMap::with_capacity(tally::estimated_capacity(fs::file_size(path)));
    let mut stats = FileStats::default();

    while let Some(line) = reader.next_line()? {
        stats.lines_read += 1;
        if stats.lines_read % constants::CANCEL_CHECK_INTERVAL_LINES == 0 {
            ctx.checkpoint(path, started)?;
        }

        let Some(token) = extract(&line, &ctx.window) else {
            continue;
        };
        stats.lines_accepted += 1;
        match local.get_mut(token) {
            Some(n) => *n += 1,
            None => {
                local.insert(token.to_owned(), 1);
            }
        }
    }
    drop(reader);

    // Last chance to back out before the contribution becomes visible.
    ctx.checkpoint(path, started)?;

    stats.distinct_tokens = local.len() as u64;
    commit(local, ctx.tally, ctx.counting);

    tracing::debug!(
        file = %path.display(),
        lines = stats.lines_read,
        accepted = stats.lines_accepted,
        distinct = stats.distinct_tokens,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "File processed"
    );

    Ok(stats)
}

fn commit(local: HashMap<String, u64>, tally: &Tally, counting: CountingMode) {
    match counting {
        CountingMode::DistinctFiles => {
            for token in local.into_keys() {
                tally.record(token);
            }
        }
        CountingMode::Lines => {
            for (token, n) in local {
                tally.add(token, n);
            }
        }
    }
}
