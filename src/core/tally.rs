// codesift - core/tally.rs
//
// Cross-file tally: token -> occurrence count, shared by every file worker.
//
// Backed by a sharded concurrent map. An update locks a single shard for the
// duration of one increment, so workers never serialise on each other's
// I/O-bound stretches. Nothing reads the tally while workers are running;
// the orchestrator consumes it only after fan-in.

use crate::util::constants;
use dashmap::DashMap;

/// Number of distinct tokens worth reserving for `compressed_bytes` of gzip
/// input, capped at `MAX_ESTIMATED_TALLY_CAPACITY`.
pub fn estimated_capacity(compressed_bytes: u64) -> usize {
    let lines = compressed_bytes / constants::COMPRESSED_BYTES_PER_LINE;
    usize::try_from(lines)
        .unwrap_or(usize::MAX)
        .min(constants::MAX_ESTIMATED_TALLY_CAPACITY)
}

/// Concurrent-safe counter keyed by accepted token.
#[derive(Debug, Default)]
pub struct Tally {
    counts: DashMap<String, u64>,
}

impl Tally {
    /// Create an empty tally with room for `capacity` distinct tokens.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: DashMap::with_capacity(capacity),
        }
    }

    /// Increment the count for `token` by one, creating it at 1 if absent.
    pub fn record(&self, token: String) {
        self.add(token, 1);
    }

    /// Increment the count for `token` by `n`.
    pub fn add(&self, token: String, n: u64) {
        *self.counts.entry(token).or_insert(0) += n;
    }

    /// Number of distinct tokens tallied.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Consume the tally, yielding every token whose count is at least
    /// `threshold`. Iteration order is unspecified.
    pub fn into_trusted(self, threshold: u64) -> impl Iterator<Item = String> {
        self.counts
            .into_iter()
            .filter(move |(_, count)| *count >= threshold)
            .map(|(token, _)| token)
    }
}
