//! The session driver: owns the index, the worker pool and the output, and
//! feeds input lines through the bulk-load and workload phases.

use std::{
    io::{BufRead, Write},
    sync::Arc,
};

use log::{debug, warn};
use ngramdb_common::{Error, Result};
use ngramdb_index::{NgramIndex, OpIndex};

use crate::{
    batch::dispatch_batch,
    config::EngineConfig,
    jobs::Query,
    metrics::SessionMetrics,
    pool::WorkerPool,
    protocol::{Command, READY_LINE, START_MARKER, parse_command, trim_line_end},
};

/// Operation index of every bulk-loaded n-gram.
pub const BULK_LOAD_OP_INDEX: OpIndex = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    BulkLoad,
    Workload,
}

/// Drives one run of the engine over an input stream.
///
/// Mutations are applied on the calling thread as soon as they are read;
/// queries are queued with the operation index current at the time and
/// evaluated together on the next flush.
pub struct Session<W: Write> {
    config: EngineConfig,
    index: Arc<NgramIndex>,
    pool: WorkerPool,
    out: W,
    pending: Vec<Query>,
    op_index: OpIndex,
    line_number: u64,
    phase: Phase,
    metrics: SessionMetrics,
}

impl<W: Write> Session<W> {
    pub fn new(config: EngineConfig, out: W) -> Result<Session<W>> {
        config.validate()?;
        let pool = WorkerPool::new(config.pool_size)?;
        debug!("session started with {config:?}");
        Ok(Session {
            config,
            index: Arc::new(NgramIndex::new()),
            pool,
            out,
            pending: Vec::new(),
            op_index: BULK_LOAD_OP_INDEX,
            line_number: 0,
            phase: Phase::BulkLoad,
            metrics: SessionMetrics::default(),
        })
    }

    /// Consumes `input` to the end and returns the collected metrics.
    ///
    /// Input ending before the start marker is an error; input ending during
    /// the workload is normal termination.
    pub fn run(mut self, mut input: impl BufRead) -> Result<SessionMetrics> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = input
                .read_line(&mut line)
                .map_err(|e| Error::io("reading input", e))?;
            if read == 0 {
                break;
            }
            self.consume_line(trim_line_end(&line))?;
        }
        if self.phase == Phase::BulkLoad {
            return Err(Error::unexpected_eof(format!(
                "input ended before the '{START_MARKER}' marker"
            )));
        }
        Ok(self.finish())
    }

    /// Routes one input line to the current phase.
    pub fn consume_line(&mut self, line: &str) -> Result<()> {
        match self.phase {
            Phase::BulkLoad if line == START_MARKER => self.finish_bulk_load(),
            Phase::BulkLoad => self.load_ngram(line),
            Phase::Workload => self.apply_line(line),
        }
    }

    /// Adds one bulk-load n-gram. Blank lines are skipped.
    pub fn load_ngram(&mut self, ngram: &str) -> Result<()> {
        self.line_number += 1;
        if self.phase != Phase::BulkLoad {
            return Err(Error::invalid_operation("load_ngram after the bulk load"));
        }
        self.metrics.bulk_load.start();
        if Arc::get_mut(&mut self.index)
            .ok_or_else(Self::index_shared)?
            .add(ngram, BULK_LOAD_OP_INDEX)
        {
            self.metrics.ngrams_loaded += 1;
        }
        Ok(())
    }

    /// Ends the bulk load and announces readiness on the output.
    pub fn finish_bulk_load(&mut self) -> Result<()> {
        self.line_number += 1;
        if self.phase != Phase::BulkLoad {
            return Err(Error::invalid_operation("finish_bulk_load called twice"));
        }
        self.metrics.bulk_load.stop();
        self.phase = Phase::Workload;
        debug!(
            "bulk load finished: {} n-grams, {:?}",
            self.metrics.ngrams_loaded,
            self.index.stats()
        );
        self.out
            .write_all(READY_LINE)
            .and_then(|()| self.out.flush())
            .map_err(|e| Error::io("writing ready line", e))
    }

    /// Applies one workload line, advancing the operation index.
    pub fn apply_line(&mut self, line: &str) -> Result<()> {
        self.line_number += 1;
        if self.phase != Phase::Workload {
            return Err(Error::invalid_operation("apply_line before the bulk load finished"));
        }
        let command = parse_command(line, self.line_number)?;
        self.op_index += 1;
        match command {
            Command::Add(ngram) => {
                self.metrics.mutations.start();
                let index = Arc::get_mut(&mut self.index).ok_or_else(Self::index_shared)?;
                index.add(ngram, self.op_index);
                self.metrics.mutations.stop();
                self.metrics.adds += 1;
            }
            Command::Remove(ngram) => {
                self.metrics.mutations.start();
                let index = Arc::get_mut(&mut self.index).ok_or_else(Self::index_shared)?;
                index.remove(ngram, self.op_index);
                self.metrics.mutations.stop();
                self.metrics.removes += 1;
            }
            Command::Query(document) => {
                self.pending.push(Query::new(document, self.op_index));
                self.metrics.queries += 1;
            }
            Command::Flush => self.flush()?,
        }
        Ok(())
    }

    /// Evaluates every pending query and writes the results.
    pub fn flush(&mut self) -> Result<()> {
        let queries = std::mem::take(&mut self.pending);
        self.metrics.flushes.start();
        let result = dispatch_batch(
            &self.index,
            &self.pool.handle(),
            &self.config,
            queries,
            &mut self.out,
        );
        self.metrics.flushes.stop();
        self.metrics.flush_count += 1;
        result
    }

    /// Index of the most recent workload operation (0 during the bulk load).
    pub fn op_index(&self) -> OpIndex {
        self.op_index
    }

    pub fn pending_queries(&self) -> usize {
        self.pending.len()
    }

    pub fn index(&self) -> &NgramIndex {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stops the worker pool and returns the final metrics.
    ///
    /// Queries still pending are dropped.
    pub fn finish(self) -> SessionMetrics {
        let Session {
            index,
            mut pool,
            mut out,
            pending,
            mut metrics,
            ..
        } = self;
        if !pending.is_empty() {
            warn!(
                "input ended with {} queries not followed by a flush; dropping them",
                pending.len()
            );
            metrics.dropped_queries = pending.len() as u64;
        }
        if let Err(e) = out.flush() {
            warn!("failed to flush output: {e}");
        }
        pool.shutdown();
        metrics.bulk_load.stop();
        metrics.trie = index.stats();
        metrics.pool = pool.stats();
        metrics
    }

    fn index_shared() -> Error {
        Error::invalid_operation("index mutation while query jobs still hold the index")
    }
}
