//! Fixed-size pool of long-lived worker threads.
//!
//! Each worker owns a bounded job queue and a shutdown-status queue. A job is
//! only ever handed to a worker whose slot was claimed idle beforehand, so
//! submission never waits behind another job. When every worker is busy,
//! [`PoolHandle::try_submit`] gives the job back and the caller runs it
//! inline. This keeps nested dispatch (a pipeline job fanning out fragment
//! scans) free of pool starvation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc::{Receiver, SendError, SyncSender},
    },
    thread::JoinHandle,
};

use log::{debug, warn};
use ngramdb_common::{Error, Result, verify_arg};
use ngramdb_workflow::idle_set::IdleSet;

use crate::{jobs::Job, metrics::PoolStats};

const JOB_QUEUE_CAPACITY: usize = 4;

/// Reported by a worker when it leaves its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    Stopped { index: usize, jobs_completed: u64 },
}

/// Owner of the worker threads.
///
/// Dropping the pool stops and joins all workers.
pub struct WorkerPool {
    handle: PoolHandle,
    status: Vec<Receiver<WorkerStatus>>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Result<WorkerPool> {
        verify_arg!(size, size > 0);

        let (slots, receivers) = (0..size)
            .map(|_| std::sync::mpsc::sync_channel::<Message>(JOB_QUEUE_CAPACITY))
            .unzip::<_, _, Vec<_>, Vec<_>>();
        let workers = Arc::new(Workers {
            slots,
            idle: IdleSet::new(size),
            dispatched: AtomicUsize::new(0),
            inline: AtomicUsize::new(0),
        });

        let mut pool = WorkerPool {
            handle: PoolHandle(workers.clone()),
            status: Vec::with_capacity(size),
            threads: Vec::with_capacity(size),
        };
        for (index, jobs) in receivers.into_iter().enumerate() {
            let (status_tx, status_rx) = std::sync::mpsc::sync_channel(1);
            let workers = workers.clone();
            let thread = std::thread::Builder::new()
                .name(format!("ngramdb-worker-{index}"))
                .spawn(move || Workers::thread_fn(workers, index, jobs, status_tx))
                .map_err(|e| Error::io(format!("spawning worker {index}"), e))?;
            pool.status.push(status_rx);
            pool.threads.push(thread);
        }
        debug!("worker pool started with {size} threads");
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.handle.0.slots.len()
    }

    /// Returns a cloneable handle for submitting jobs.
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub fn stats(&self) -> PoolStats {
        self.handle.stats()
    }

    /// Stops every worker and waits for it to exit.
    ///
    /// Workers finish the jobs already queued to them first. Returns the
    /// status each worker reported; a worker that died without reporting is
    /// logged and left out. Calling this again is a no-op.
    pub fn shutdown(&mut self) -> Vec<WorkerStatus> {
        if self.threads.is_empty() {
            return Vec::new();
        }
        self.handle.0.stop();

        let statuses = self
            .status
            .drain(..)
            .enumerate()
            .filter_map(|(index, rx)| match rx.recv() {
                Ok(status) => Some(status),
                Err(_) => {
                    warn!("worker {index} exited without reporting its status");
                    None
                }
            })
            .collect::<Vec<_>>();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
        debug!("worker pool stopped: {statuses:?}");
        statuses
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Shared, cloneable access to the pool's job queues.
#[derive(Clone)]
pub struct PoolHandle(Arc<Workers>);

impl PoolHandle {
    /// Hands `job` to an idle worker.
    ///
    /// Returns the job back when no worker is idle (or the chosen worker is
    /// gone), in which case the caller is expected to run it itself.
    pub fn try_submit(&self, job: Job) -> std::result::Result<(), Job> {
        let Some(slot) = self.0.idle.try_claim() else {
            return Err(job);
        };
        if let Err(SendError(message)) = self.0.slots[slot].send(Message::Run(job)) {
            // Dead worker: its slot stays claimed so it is never picked again.
            warn!("worker {slot} is gone; running job inline");
            if let Message::Run(job) = message {
                return Err(job);
            }
        }
        self.0.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Submits `job`, running it on the current thread if no worker is idle.
    pub fn submit_or_run(&self, job: Job) {
        if let Err(job) = self.try_submit(job) {
            self.run_inline(job);
        }
    }

    /// Runs `job` on the current thread and counts it as inline work.
    pub fn run_inline(&self, job: Job) {
        self.0.inline.fetch_add(1, Ordering::Relaxed);
        job.run();
    }

    pub fn idle_workers(&self) -> usize {
        self.0.idle.len() - self.0.idle.claimed_count()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            workers: self.0.slots.len(),
            dispatched: self.0.dispatched.load(Ordering::Relaxed),
            inline: self.0.inline.load(Ordering::Relaxed),
        }
    }
}

struct Workers {
    slots: Vec<SyncSender<Message>>,
    idle: IdleSet,
    dispatched: AtomicUsize,
    inline: AtomicUsize,
}

impl Workers {
    fn stop(&self) {
        self.slots.iter().for_each(|tx| {
            let _ = tx.send(Message::Stop);
        });
    }

    fn thread_fn(
        workers: Arc<Workers>,
        index: usize,
        rx: Receiver<Message>,
        status: SyncSender<WorkerStatus>,
    ) {
        let mut jobs_completed = 0;
        while let Ok(Message::Run(job)) = rx.recv() {
            job.run();
            jobs_completed += 1;
            workers.idle.release(index);
        }
        let _ = status.send(WorkerStatus::Stopped {
            index,
            jobs_completed,
        });
    }
}

enum Message {
    Run(Job),
    Stop,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ngramdb_index::{Match, NgramIndex};
    use ngramdb_workflow::oneshot::{self, OneshotReceiver};

    use super::*;
    use crate::jobs::ScanJob;

    fn scan_job(index: &Arc<NgramIndex>, text: &str) -> (Job, OneshotReceiver<Vec<Match>>) {
        let (tx, rx) = oneshot::channel();
        let document: Arc<str> = text.into();
        let fragment = 0..document.len();
        (
            Job::Scan(ScanJob::new(index.clone(), document, fragment, 1, tx)),
            rx,
        )
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }

    #[test]
    fn test_jobs_run_on_workers() {
        let mut index = NgramIndex::new();
        index.add("b c", 0);
        let index = Arc::new(index);

        let mut pool = WorkerPool::new(2).unwrap();
        let handle = pool.handle();
        let (job, rx) = scan_job(&index, "a b c");
        handle.submit_or_run(job);
        let matches = rx.recv().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 2);

        let statuses = pool.shutdown();
        let completed = statuses
            .iter()
            .map(|WorkerStatus::Stopped { jobs_completed, .. }| *jobs_completed)
            .sum::<u64>();
        assert_eq!(statuses.len(), 2);
        assert_eq!(completed, 1);
        assert_eq!(pool.stats().dispatched, 1);
        assert!(pool.shutdown().is_empty());
    }

    #[test]
    fn test_busy_pool_returns_job() {
        let pool = WorkerPool::new(1).unwrap();
        let handle = pool.handle();
        let index = Arc::new(NgramIndex::new());

        // Claim the only slot so the pool looks busy.
        let slot = handle.0.idle.try_claim().unwrap();
        assert_eq!(handle.idle_workers(), 0);
        let (job, rx) = scan_job(&index, "x");
        let job = handle.try_submit(job).unwrap_err();
        handle.run_inline(job);
        assert_eq!(rx.recv(), Some(Vec::new()));
        assert_eq!(handle.stats().inline, 1);

        handle.0.idle.release(slot);
        assert_eq!(handle.idle_workers(), 1);
    }

    #[test]
    fn test_drop_joins_workers() {
        let pool = WorkerPool::new(3).unwrap();
        let handle = pool.handle();
        drop(pool);
        // Queues are closed once the workers exited.
        let index = Arc::new(NgramIndex::new());
        let (job, _rx) = scan_job(&index, "x");
        assert!(handle.try_submit(job).is_err());
    }
}
