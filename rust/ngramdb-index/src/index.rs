//! The n-gram index: word-aware mutation and scanning on top of the versioned
//! trie.
//!
//! An n-gram is stored as the byte path of its words joined by single spaces.
//! Scanning a document walks that same path word by word, so a document with
//! repeated spaces between words still matches the single-spaced n-gram.

use log::debug;

use crate::{
    matches::Match,
    op_log::{OpIndex, OpKind},
    trie::{Trie, TrieNode, TrieStats},
};

const WORD_SEPARATOR: u8 = b' ';

/// Owns the trie root and exposes add, remove and point-in-time scanning.
///
/// Mutation requires `&mut self` and scanning only `&self`: concurrent scans
/// are safe whenever no mutation can run at the same time, which is exactly
/// what a shared `Arc<NgramIndex>` expresses.
#[derive(Debug, Default)]
pub struct NgramIndex {
    trie: Trie,
}

impl NgramIndex {
    pub fn new() -> NgramIndex {
        NgramIndex { trie: Trie::new() }
    }

    /// Registers `ngram` as a member starting at `op_index`.
    ///
    /// Leading, trailing and repeated spaces are ignored. Returns `false` (and
    /// records nothing) if the n-gram has no words.
    pub fn add(&mut self, ngram: &str, op_index: OpIndex) -> bool {
        if !has_words(ngram) {
            debug!("ignoring add of an empty n-gram at op {op_index}");
            return false;
        }
        self.trie
            .insert(ngram_path(ngram))
            .append(OpKind::Add, op_index);
        true
    }

    /// Marks `ngram` as removed starting at `op_index`.
    ///
    /// Removing an n-gram that was never inserted is a silent no-op; the return
    /// value reports whether a record was appended.
    pub fn remove(&mut self, ngram: &str, op_index: OpIndex) -> bool {
        if !has_words(ngram) {
            return false;
        }
        match self.trie.lookup_mut(ngram_path(ngram)) {
            Some(node) => {
                node.append(OpKind::Remove, op_index);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `ngram` is a member as of `op_index`.
    pub fn contains(&self, ngram: &str, op_index: OpIndex) -> bool {
        has_words(ngram)
            && self
                .trie
                .lookup(ngram_path(ngram))
                .is_some_and(|node| node.is_visible_at(op_index))
    }

    /// Finds every member n-gram occurring in `text` as of `op_index`.
    ///
    /// Every word start is a candidate; overlapping matches starting at
    /// different words are all reported, in order of their starting word and
    /// then of their length. Positions are `global_offset` plus the byte offset
    /// of the match within `text`.
    pub fn find_matches(&self, text: &str, global_offset: usize, op_index: OpIndex) -> Vec<Match> {
        self.find_matches_from(text, text.len(), global_offset, op_index)
    }

    /// Same as [`find_matches`](Self::find_matches), but only words starting
    /// before `start_limit` begin a walk.
    ///
    /// A walk may continue past `start_limit` up to the end of `text`, which is
    /// what keeps matches spanning a fragment seam intact when a document is
    /// scanned in pieces.
    pub fn find_matches_from(
        &self,
        text: &str,
        start_limit: usize,
        global_offset: usize,
        op_index: OpIndex,
    ) -> Vec<Match> {
        let bytes = text.as_bytes();
        let start_limit = start_limit.min(bytes.len());
        let mut results = Vec::new();

        let mut start = skip_separators(bytes, 0);
        while start < start_limit {
            self.walk_from(text, start, global_offset, op_index, &mut results);
            start = skip_separators(bytes, word_end(bytes, start));
        }
        results
    }

    pub fn stats(&self) -> TrieStats {
        self.trie.stats()
    }

    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    /// Extends a single trie walk one word at a time from the word at `start`,
    /// emitting every visible node reached at a word end.
    fn walk_from(
        &self,
        text: &str,
        start: usize,
        global_offset: usize,
        op_index: OpIndex,
        results: &mut Vec<Match>,
    ) {
        let bytes = text.as_bytes();
        let mut node: &TrieNode = self.trie.root();
        let mut pos = start;
        loop {
            let end = word_end(bytes, pos);
            let separator = (pos > start).then_some(WORD_SEPARATOR);
            let mut path = separator
                .into_iter()
                .chain(bytes[pos..end].iter().copied());
            let Some(next) = path.try_fold(node, |node, byte| node.child(byte)) else {
                return;
            };
            node = next;

            if node.is_visible_at(op_index) {
                results.push(Match::new(&text[start..end], global_offset + start));
            }

            pos = skip_separators(bytes, end);
            if pos >= bytes.len() {
                return;
            }
        }
    }
}

fn has_words(ngram: &str) -> bool {
    ngram.bytes().any(|b| b != WORD_SEPARATOR)
}

/// Byte path of an n-gram: its words joined by single separators.
fn ngram_path(ngram: &str) -> impl Iterator<Item = u8> {
    ngram
        .split(WORD_SEPARATOR as char)
        .filter(|word| !word.is_empty())
        .enumerate()
        .flat_map(|(i, word)| {
            (i > 0)
                .then_some(WORD_SEPARATOR)
                .into_iter()
                .chain(word.bytes())
        })
}

#[inline]
fn skip_separators(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos] == WORD_SEPARATOR {
        pos += 1;
    }
    pos
}

#[inline]
fn word_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos] != WORD_SEPARATOR {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(matches: &[Match]) -> Vec<&str> {
        matches.iter().map(|m| m.term.as_str()).collect()
    }

    #[test]
    fn test_point_in_time_example() {
        let mut index = NgramIndex::new();
        index.add("the cat", 1);

        let hits = index.find_matches("the cat sat", 0, 2);
        assert_eq!(hits, vec![Match::new("the cat", 0)]);

        index.remove("the cat", 3);
        assert!(index.find_matches("the cat sat", 0, 4).is_empty());
        // A query that captured index 2 still sees the n-gram.
        assert_eq!(terms(&index.find_matches("the cat sat", 0, 2)), vec!["the cat"]);
    }

    #[test]
    fn test_overlapping_matches() {
        let mut index = NgramIndex::new();
        for ngram in ["a", "a b", "b c", "a b c d", "c"] {
            index.add(ngram, 0);
        }
        let hits = index.find_matches("a b c d", 0, 1);
        assert_eq!(
            hits,
            vec![
                Match::new("a", 0),
                Match::new("a b", 0),
                Match::new("a b c d", 0),
                Match::new("b c", 2),
                Match::new("c", 4),
            ]
        );
    }

    #[test]
    fn test_walk_stops_at_missing_word() {
        let mut index = NgramIndex::new();
        index.add("new york city", 0);
        index.add("york", 0);

        // "new york" is only a prefix path, never a member.
        assert_eq!(terms(&index.find_matches("new york state", 0, 1)), vec!["york"]);
        assert_eq!(
            terms(&index.find_matches("in new york city now", 0, 1)),
            vec!["new york city", "york"]
        );
        // Partial word matches do not count.
        assert!(index.find_matches("yorkshire newyork", 0, 1).is_empty());
    }

    #[test]
    fn test_spaces_are_collapsed() {
        let mut index = NgramIndex::new();
        assert!(index.add("  hello   world ", 0));
        assert!(index.contains("hello world", 0));
        assert!(!index.contains("hello", 0));

        let hits = index.find_matches("   hello  world   ", 10, 1);
        assert_eq!(hits, vec![Match::new("hello  world", 13)]);
    }

    #[test]
    fn test_empty_inputs() {
        let mut index = NgramIndex::new();
        assert!(!index.add("", 0));
        assert!(!index.add("   ", 0));
        assert_eq!(index.stats().nodes, 1);
        assert!(index.find_matches("", 0, 1).is_empty());
        assert!(index.find_matches("    ", 0, 1).is_empty());
        assert!(!index.remove("", 1));
    }

    #[test]
    fn test_remove_never_added_is_noop() {
        let mut index = NgramIndex::new();
        index.add("alpha beta", 0);
        let nodes = index.stats().nodes;
        assert!(!index.remove("alpha gamma", 1));
        assert!(!index.remove("zeta", 2));
        assert_eq!(index.stats().nodes, nodes);
        // Removing a prefix path appends a record but never makes it visible.
        assert!(index.remove("alpha", 3));
        assert!(!index.contains("alpha", 4));
        assert!(index.contains("alpha beta", 4));
    }

    #[test]
    fn test_readd_after_remove() {
        let mut index = NgramIndex::new();
        index.add("x y", 1);
        index.remove("x y", 2);
        index.add("x y", 5);
        let visible = (0..8)
            .filter(|&op| !index.find_matches("x y", 0, op).is_empty())
            .collect::<Vec<_>>();
        assert_eq!(visible, vec![1, 5, 6, 7]);
    }

    #[test]
    fn test_start_limit_allows_walk_past_limit() {
        let mut index = NgramIndex::new();
        index.add("b c", 0);
        index.add("c", 0);
        let text = "a b c";

        // Only "a" and "b" may start a walk; "b c" crosses the limit.
        let hits = index.find_matches_from(text, 3, 100, 1);
        assert_eq!(hits, vec![Match::new("b c", 102)]);

        let hits = index.find_matches_from(&text[4..], text.len() - 4, 104, 1);
        assert_eq!(hits, vec![Match::new("c", 104)]);
    }

    #[test]
    fn test_non_ascii_words() {
        let mut index = NgramIndex::new();
        index.add("über straße", 0);
        let text = "die über straße";
        let hits = index.find_matches(text, 0, 1);
        assert_eq!(hits, vec![Match::new("über straße", 4)]);
    }

    #[test]
    fn test_idempotent_add() {
        let mut index = NgramIndex::new();
        index.add("one two", 1);
        let nodes = index.stats().nodes;
        index.add("one two", 2);
        assert_eq!(index.stats().nodes, nodes);
        let node = index.trie().lookup(*b"one two").unwrap();
        assert_eq!(node.log().len(), 2);
    }
}
