//! Job descriptors executed by pool workers (or inline by a dispatcher).
//!
//! Every job carries its own result sender. A job releases its share of the
//! index before publishing the result, so once a dispatcher has received all
//! results it again holds the only reference to the index.

use std::{ops::Range, sync::Arc};

use ngramdb_common::Result;
use ngramdb_index::{Match, NgramIndex, OpIndex, write_result_line};
use ngramdb_workflow::oneshot::OneshotSender;

use crate::{config::EngineConfig, document::dispatch_document, pool::PoolHandle};

/// A query captured at parse time, together with the operation index that
/// defines which index state it observes.
#[derive(Debug, Clone)]
pub struct Query {
    pub document: Arc<str>,
    pub op_index: OpIndex,
}

impl Query {
    pub fn new(document: impl Into<Arc<str>>, op_index: OpIndex) -> Query {
        Query {
            document: document.into(),
            op_index,
        }
    }
}

pub enum Job {
    Scan(ScanJob),
    Pipeline(PipelineJob),
}

impl Job {
    pub fn run(self) {
        match self {
            Job::Scan(job) => job.run(),
            Job::Pipeline(job) => job.run(),
        }
    }
}

/// Scans one fragment of a document.
pub struct ScanJob {
    index: Arc<NgramIndex>,
    document: Arc<str>,
    fragment: Range<usize>,
    op_index: OpIndex,
    result: OneshotSender<Vec<Match>>,
}

impl ScanJob {
    /// `fragment` must start at offset 0 or at a space, so that it begins on
    /// a word boundary.
    pub fn new(
        index: Arc<NgramIndex>,
        document: Arc<str>,
        fragment: Range<usize>,
        op_index: OpIndex,
        result: OneshotSender<Vec<Match>>,
    ) -> ScanJob {
        debug_assert!(fragment.end <= document.len());
        ScanJob {
            index,
            document,
            fragment,
            op_index,
            result,
        }
    }

    pub fn run(self) {
        let ScanJob {
            index,
            document,
            fragment,
            op_index,
            result,
        } = self;
        let matches = index.find_matches_from(
            &document[fragment.start..],
            fragment.len(),
            fragment.start,
            op_index,
        );
        drop(index);
        let _ = result.send(matches);
    }
}

/// Processes a contiguous slice of a flushed batch, one query at a time,
/// writing each result line into a private buffer.
pub struct PipelineJob {
    index: Arc<NgramIndex>,
    pool: PoolHandle,
    config: EngineConfig,
    queries: Vec<Query>,
    result: OneshotSender<Result<Vec<u8>>>,
}

impl PipelineJob {
    pub fn new(
        index: Arc<NgramIndex>,
        pool: PoolHandle,
        config: EngineConfig,
        queries: Vec<Query>,
        result: OneshotSender<Result<Vec<u8>>>,
    ) -> PipelineJob {
        PipelineJob {
            index,
            pool,
            config,
            queries,
            result,
        }
    }

    pub fn run(self) {
        let PipelineJob {
            index,
            pool,
            config,
            queries,
            result,
        } = self;
        let mut buffer = Vec::new();
        let outcome = queries.iter().try_for_each(|query| {
            let matches = dispatch_document(&index, &pool, &config, query)?;
            write_result_line(&matches, &mut buffer);
            Ok(())
        });
        drop(index);
        let _ = result.send(outcome.map(|()| buffer));
    }
}

#[cfg(test)]
mod tests {
    use ngramdb_workflow::oneshot;

    use super::*;
    use crate::pool::WorkerPool;

    #[test]
    fn test_scan_job_releases_index() {
        let mut index = NgramIndex::new();
        index.add("cat", 0);
        let mut index = Arc::new(index);

        let document: Arc<str> = "dog cat cat".into();
        let (tx, rx) = oneshot::channel();
        // Second half only: the walk starts at the space before the second "cat".
        let job = ScanJob::new(index.clone(), document.clone(), 7..11, 1, tx);
        std::thread::spawn(move || job.run());

        let matches = rx.recv().unwrap();
        assert_eq!(matches, vec![Match::new("cat", 8)]);
        assert!(Arc::get_mut(&mut index).is_some());
    }

    #[test]
    fn test_pipeline_job_writes_lines_in_order() {
        let mut index = NgramIndex::new();
        index.add("a", 0);
        index.add("b", 2);
        let index = Arc::new(index);
        let pool = WorkerPool::new(2).unwrap();

        let queries = vec![Query::new("a b", 1), Query::new("a b a", 3), Query::new("", 3)];
        let (tx, rx) = oneshot::channel();
        let job = PipelineJob::new(
            index,
            pool.handle(),
            EngineConfig::sequential(),
            queries,
            tx,
        );
        pool.handle().submit_or_run(Job::Pipeline(job));

        let buffer = rx.recv().unwrap().unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "a\na|b\n-1\n");
    }
}
