//! Query engine over a versioned n-gram index.
//!
//! A [`Session`] reads a bulk-load section followed by a stream of add, remove,
//! query and flush commands. Mutations are applied in stream order; every
//! query observes the index exactly as it was when the query was read, even
//! though it is evaluated later, in parallel with other queries, on a fixed
//! pool of worker threads.
//!
//! ```
//! use ngramdb_engine::{EngineConfig, Session};
//!
//! let input = "the cat\nS\nQ the cat sat\nD the cat\nQ the cat sat\nF\n";
//! let mut out = Vec::new();
//! Session::new(EngineConfig::default(), &mut out)
//!     .unwrap()
//!     .run(input.as_bytes())
//!     .unwrap();
//! assert_eq!(out, b"R\nthe cat\n-1\n");
//! ```

pub mod batch;
pub mod config;
pub mod document;
pub mod jobs;
pub mod metrics;
pub mod pool;
pub mod protocol;
pub mod session;

pub use config::EngineConfig;
pub use metrics::{SessionMetrics, Stopwatch};
pub use pool::{PoolHandle, WorkerPool};
pub use session::Session;
