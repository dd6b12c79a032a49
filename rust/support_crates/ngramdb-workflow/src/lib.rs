//! Thread coordination primitives used by the ngramdb worker pool.
//!
//! - [`oneshot`] - Single-value result delivery from a worker back to the
//!   thread that dispatched the job
//! - [`idle_set`] - Lock-free bookkeeping of which worker slots are busy, so
//!   that a job is only ever handed to a worker that can start it right away

pub mod idle_set;
pub mod oneshot;
