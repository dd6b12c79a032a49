//! Lock-free set of claimed (busy) worker slots.

use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-capacity bit set where a set bit marks a busy worker slot.
///
/// A dispatcher claims a free slot with [`try_claim`](Self::try_claim) before
/// handing a job to that slot's worker; the worker releases the slot once the
/// job has finished. Because jobs are only ever queued behind an idle worker, a
/// dispatcher waiting for its jobs can never wait on itself.
pub struct IdleSet {
    words: Box<[AtomicU64]>,
    len: usize,
}

impl IdleSet {
    /// Creates a set of `len` slots, all free.
    pub fn new(len: usize) -> IdleSet {
        IdleSet {
            words: (0..len.div_ceil(64)).map(|_| AtomicU64::new(0)).collect(),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Claims the lowest free slot, or returns `None` when every slot is busy.
    pub fn try_claim(&self) -> Option<usize> {
        for (i, word) in self.words.iter().enumerate() {
            let mut current = word.load(Ordering::Relaxed);
            loop {
                let bit = current.trailing_ones() as usize;
                if bit == 64 || i * 64 + bit >= self.len {
                    break;
                }
                match word.compare_exchange_weak(
                    current,
                    current | (1 << bit),
                    Ordering::SeqCst,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => return Some(i * 64 + bit),
                    Err(actual) => current = actual,
                }
            }
        }
        None
    }

    /// Frees a slot. Returns `true` if it was claimed.
    pub fn release(&self, index: usize) -> bool {
        assert!(index < self.len);
        let mask = 1u64 << (index & 63);
        self.words[index >> 6].fetch_and(!mask, Ordering::SeqCst) & mask != 0
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        assert!(index < self.len);
        let mask = 1u64 << (index & 63);
        self.words[index >> 6].load(Ordering::SeqCst) & mask != 0
    }

    /// Number of slots currently claimed.
    pub fn claimed_count(&self) -> usize {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }
}
