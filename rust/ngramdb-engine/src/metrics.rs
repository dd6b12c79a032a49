//! Session-scoped timing and counters.
//!
//! Metrics are owned by the [`Session`](crate::session::Session) that produces
//! them and handed back to the caller when the session ends; nothing here is
//! global.

use std::time::{Duration, Instant};

use log::info;
use ngramdb_index::TrieStats;

/// Accumulating wall-clock stopwatch.
#[derive(Debug, Default, Clone)]
pub struct Stopwatch {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch::default()
    }

    /// Starts (or resumes) measuring. No-op if already running.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stops measuring and adds the interval to the accumulated time.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Accumulated time, including the current interval if running.
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Runs `f` while the stopwatch is running.
    pub fn time<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.start();
        let result = f();
        self.stop();
        result
    }
}

/// Worker pool usage counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    /// Jobs handed to a worker thread.
    pub dispatched: usize,
    /// Jobs run on the dispatching thread (last fragment or pipeline, or no
    /// idle worker).
    pub inline: usize,
}

#[derive(Debug, Default, Clone)]
pub struct SessionMetrics {
    pub bulk_load: Stopwatch,
    pub mutations: Stopwatch,
    pub flushes: Stopwatch,
    pub ngrams_loaded: u64,
    pub adds: u64,
    pub removes: u64,
    pub queries: u64,
    pub flush_count: u64,
    /// Queries that were still pending when the input ended.
    pub dropped_queries: u64,
    pub trie: TrieStats,
    pub pool: PoolStats,
}

impl SessionMetrics {
    pub fn log_report(&self) {
        info!(
            "bulk load: {} n-grams in {:?}",
            self.ngrams_loaded,
            self.bulk_load.elapsed()
        );
        info!(
            "mutations: {} adds, {} removes in {:?}",
            self.adds,
            self.removes,
            self.mutations.elapsed()
        );
        info!(
            "queries: {} in {} flushes, {:?} ({} dropped at end of input)",
            self.queries,
            self.flush_count,
            self.flushes.elapsed(),
            self.dropped_queries
        );
        info!(
            "trie: {} nodes, {} direct-indexed",
            self.trie.nodes, self.trie.direct_nodes
        );
        info!(
            "pool: {} workers, {} jobs dispatched, {} run inline",
            self.pool.workers, self.pool.dispatched, self.pool.inline
        );
    }
}
