//! Per-document dispatch: scans a single query document, optionally split into
//! word-aligned fragments that are scanned in parallel.

use std::{ops::Range, sync::Arc};

use log::trace;
use ngramdb_common::{Error, Result};
use ngramdb_index::{Match, NgramIndex, dedup_by_term};
use ngramdb_workflow::oneshot;

use crate::{
    config::EngineConfig,
    jobs::{Job, Query, ScanJob},
    pool::PoolHandle,
};

/// Returns the deduplicated matches of `query` against the index state at the
/// query's operation index.
///
/// Short documents (or a single fragment worker) are scanned directly on the
/// calling thread. Longer ones are split into up to `fragment_workers`
/// fragments; all but the last are offered to the pool and the last one is
/// scanned here. Results are merged in fragment order, so the outcome does not
/// depend on how many fragments ran in parallel.
pub fn dispatch_document(
    index: &Arc<NgramIndex>,
    pool: &PoolHandle,
    config: &EngineConfig,
    query: &Query,
) -> Result<Vec<Match>> {
    let document = &query.document;
    if config.fragment_workers <= 1 || document.len() < config.split_threshold {
        return Ok(dedup_by_term(index.find_matches(
            document,
            0,
            query.op_index,
        )));
    }

    let fragments = split_fragments(document, config.fragment_workers);
    trace!(
        "scanning {} bytes in {} fragments",
        document.len(),
        fragments.len()
    );
    let last = fragments.len().saturating_sub(1);
    let mut receivers = Vec::with_capacity(fragments.len());
    let mut local = None;
    for (i, fragment) in fragments.into_iter().enumerate() {
        let (tx, rx) = oneshot::channel();
        let job = Job::Scan(ScanJob::new(
            index.clone(),
            document.clone(),
            fragment,
            query.op_index,
            tx,
        ));
        receivers.push(rx);
        if i == last {
            local = Some(job);
        } else {
            pool.submit_or_run(job);
        }
    }
    if let Some(job) = local {
        pool.run_inline(job);
    }

    let mut matches = Vec::new();
    for (i, rx) in receivers.into_iter().enumerate() {
        let fragment = rx
            .recv()
            .ok_or_else(|| Error::worker_lost(format!("scan of document fragment {i}")))?;
        matches.extend(fragment);
    }
    Ok(dedup_by_term(matches))
}

/// Splits `document` into at most `count` contiguous byte ranges covering it.
///
/// Each range is at least `len / count` bytes (rounded up) long, extended
/// forward to the next space or to the end of the document, so every range
/// after the first starts on a space.
pub fn split_fragments(document: &str, count: usize) -> Vec<Range<usize>> {
    let bytes = document.as_bytes();
    let len = bytes.len();
    let chunk = len.div_ceil(count.max(1)).max(1);

    let mut fragments = Vec::with_capacity(count);
    let mut start = 0;
    while start < len {
        let mut end = (start + chunk).min(len);
        while end < len && bytes[end] != b' ' {
            end += 1;
        }
        fragments.push(start..end);
        start = end;
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;

    fn index_of(ngrams: &[&str]) -> Arc<NgramIndex> {
        let mut index = NgramIndex::new();
        for ngram in ngrams {
            index.add(ngram, 0);
        }
        Arc::new(index)
    }

    fn split_config(fragment_workers: usize) -> EngineConfig {
        EngineConfig {
            pool_size: 4,
            parallelism: 1,
            fragment_workers,
            split_threshold: 1,
        }
    }

    #[test]
    fn test_split_fragments_word_aligned() {
        let document = "alpha beta gamma delta epsilon";
        let fragments = split_fragments(document, 3);
        assert!(fragments.len() <= 3);
        assert_eq!(fragments.first().unwrap().start, 0);
        assert_eq!(fragments.last().unwrap().end, document.len());
        for pair in fragments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(document.as_bytes()[pair[1].start], b' ');
        }
    }

    #[test]
    fn test_split_fragments_single_word() {
        assert_eq!(split_fragments("abcdefgh", 4), vec![0..8]);
        assert!(split_fragments("", 4).is_empty());
    }

    #[test]
    fn test_split_matches_whole_scan() {
        let index = index_of(&["quick brown", "brown fox", "fox", "lazy dog", "the"]);
        let pool = WorkerPool::new(4).unwrap();
        let query = Query::new(
            "the quick brown fox jumps over the lazy dog and the brown fox again",
            1,
        );

        let whole = dispatch_document(&index, &pool.handle(), &EngineConfig::sequential(), &query)
            .unwrap();
        for workers in 2..=6 {
            let split =
                dispatch_document(&index, &pool.handle(), &split_config(workers), &query).unwrap();
            assert_eq!(split, whole, "fragment_workers = {workers}");
        }
        let terms = whole.iter().map(|m| m.term.as_str()).collect::<Vec<_>>();
        assert_eq!(terms, vec!["the", "quick brown", "brown fox", "fox", "lazy dog"]);
    }

    #[test]
    fn test_short_document_not_split() {
        let index = index_of(&["a"]);
        let pool = WorkerPool::new(2).unwrap();
        let config = EngineConfig {
            split_threshold: 1024,
            ..split_config(4)
        };
        let matches =
            dispatch_document(&index, &pool.handle(), &config, &Query::new("a a a", 1)).unwrap();
        assert_eq!(matches, vec![Match::new("a", 0)]);
        assert_eq!(pool.stats().dispatched + pool.stats().inline, 0);
    }
}
