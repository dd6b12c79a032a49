//! Versioned n-gram index.
//!
//! This crate holds the single-threaded core of ngramdb: a byte-keyed trie whose
//! nodes carry an append-only log of timestamped add/remove records, and the
//! [`NgramIndex`] built on top of it.
//!
//! # Point-in-time visibility
//!
//! Every mutation is tagged with an operation index taken from a single global
//! counter. A node never stores "is valid"; instead, membership at index `K` is
//! derived from the newest record whose index is `<= K`. A query that captured
//! `K` therefore observes exactly the mutations issued before it, no matter how
//! many later mutations have already been appended by the time it runs.
//!
//! ```rust
//! use ngramdb_index::NgramIndex;
//!
//! let mut index = NgramIndex::new();
//! index.add("the cat", 1);
//! index.remove("the cat", 3);
//!
//! let terms = |op| {
//!     index
//!         .find_matches("the cat sat", 0, op)
//!         .into_iter()
//!         .map(|m| m.term)
//!         .collect::<Vec<_>>()
//! };
//! assert_eq!(terms(2), vec!["the cat"]);
//! assert!(terms(4).is_empty());
//! ```

pub mod index;
pub mod matches;
pub mod op_log;
pub mod trie;

pub use index::NgramIndex;
pub use matches::{Match, dedup_by_term, write_result_line};
pub use op_log::{OpIndex, OpKind, OpLog, OpRecord};
pub use trie::{Trie, TrieNode, TrieStats};
