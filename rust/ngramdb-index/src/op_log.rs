//! Append-only operation log attached to every trie node.
//!
//! The log is the only state that distinguishes a member n-gram from a mere
//! prefix path: the node exists as soon as its byte path was inserted, but it
//! becomes visible only through an [`OpKind::Add`] record.

/// Logical clock value: the number of workload lines consumed so far.
///
/// The initial bulk load uses index `0`, which is visible to every query.
pub type OpIndex = u64;

/// The kind of a recorded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Remove,
}

/// A single ledger entry: which mutation happened, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecord {
    pub kind: OpKind,
    pub op_index: OpIndex,
}

/// Ordered sequence of [`OpRecord`]s, append-only and non-decreasing in
/// `op_index`.
#[derive(Debug, Default, Clone)]
pub struct OpLog {
    records: Vec<OpRecord>,
}

impl OpLog {
    pub fn new() -> OpLog {
        OpLog {
            records: Vec::new(),
        }
    }

    /// Appends a record.
    ///
    /// The caller (the single mutation thread) guarantees that `op_index` never
    /// decreases across appends.
    pub fn append(&mut self, kind: OpKind, op_index: OpIndex) {
        debug_assert!(
            self.records
                .last()
                .is_none_or(|last| last.op_index <= op_index),
            "operation index went backwards: {op_index} after {:?}",
            self.records.last()
        );
        self.records.push(OpRecord { kind, op_index });
    }

    /// Returns the membership state as of `op_index`.
    ///
    /// Scans from the newest record backward and stops at the first record
    /// with an index `<= op_index`. No such record means "not a member".
    pub fn is_visible_at(&self, op_index: OpIndex) -> bool {
        // Fast path: the newest record is at or below `op_index`.
        match self.records.last() {
            None => false,
            Some(last) if last.op_index <= op_index => last.kind == OpKind::Add,
            Some(_) => self
                .records
                .iter()
                .rev()
                .find(|record| record.op_index <= op_index)
                .is_some_and(|record| record.kind == OpKind::Add),
        }
    }

    pub fn latest(&self) -> Option<&OpRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpRecord> {
        self.records.iter()
    }
}
