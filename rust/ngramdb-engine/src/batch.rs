//! Batch dispatch: evaluates all queries pending at a flush and writes their
//! result lines in submission order.

use std::{io::Write, ops::Range, sync::Arc};

use log::debug;
use ngramdb_common::{Error, Result};
use ngramdb_index::NgramIndex;
use ngramdb_workflow::oneshot;

use crate::{
    config::EngineConfig,
    jobs::{Job, PipelineJob, Query},
    pool::PoolHandle,
};

/// Splits `len` items into `parts` contiguous ranges whose sizes differ by at
/// most one; the first `len % parts` ranges get the extra item.
///
/// Yields fewer ranges when there are fewer items than parts, and none for an
/// empty input.
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.min(len);
    if parts == 0 {
        return Vec::new();
    }
    let base = len / parts;
    let extra = len % parts;
    let mut start = 0;
    (0..parts)
        .map(|i| {
            let size = base + usize::from(i < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Runs `queries` as up to `config.parallelism` pipelines and writes one
/// result line per query to `out`, in the order the queries were given.
///
/// The last pipeline runs on the calling thread. Returns only after every
/// pipeline finished, so no job holds on to `index` afterwards.
pub fn dispatch_batch(
    index: &Arc<NgramIndex>,
    pool: &PoolHandle,
    config: &EngineConfig,
    queries: Vec<Query>,
    out: &mut impl Write,
) -> Result<()> {
    let slices = partition(queries.len(), config.parallelism);
    if slices.is_empty() {
        return Ok(());
    }
    debug!(
        "dispatching {} queries over {} pipelines",
        queries.len(),
        slices.len()
    );

    let mut queries = queries.into_iter();
    let mut receivers = Vec::with_capacity(slices.len());
    let mut local = None;
    for (i, slice) in slices.iter().enumerate() {
        let (tx, rx) = oneshot::channel();
        let job = Job::Pipeline(PipelineJob::new(
            index.clone(),
            pool.clone(),
            *config,
            queries.by_ref().take(slice.len()).collect(),
            tx,
        ));
        receivers.push(rx);
        if i + 1 == slices.len() {
            local = Some(job);
        } else {
            pool.submit_or_run(job);
        }
    }
    if let Some(job) = local {
        pool.run_inline(job);
    }

    // Wait for every pipeline before looking at any outcome.
    let outcomes = receivers
        .into_iter()
        .map(|rx| rx.recv())
        .collect::<Vec<_>>();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        let buffer =
            outcome.ok_or_else(|| Error::worker_lost(format!("query pipeline {i}")))??;
        out.write_all(&buffer)
            .map_err(|e| Error::io("writing query results", e))?;
    }
    out.flush()
        .map_err(|e| Error::io("flushing query results", e))?;
    Ok(())
}
