//! Match results and their serialized form.

use ahash::AHashSet;
use itertools::Itertools;

/// A known n-gram found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Matched text span, from the first byte of the first word to the last
    /// byte of the last word.
    pub term: String,
    /// Absolute byte offset of the span within the document.
    pub position: usize,
}

impl Match {
    pub fn new(term: impl Into<String>, position: usize) -> Match {
        Match {
            term: term.into(),
            position,
        }
    }
}

/// Keeps only the first occurrence of each term text, preserving order.
///
/// Matches arrive in document order (fragment by fragment, walk by walk), so
/// the surviving entry of a term is its earliest occurrence.
pub fn dedup_by_term(matches: Vec<Match>) -> Vec<Match> {
    if matches.len() < 2 {
        return matches;
    }
    let mut seen = AHashSet::with_capacity(matches.len());
    matches
        .into_iter()
        .filter(|m| seen.insert(m.term.clone()))
        .collect()
}

/// Appends the output line for one query: the terms joined by `|`, or `-1`
/// when nothing matched.
pub fn write_result_line(matches: &[Match], out: &mut Vec<u8>) {
    if matches.is_empty() {
        out.extend_from_slice(b"-1\n");
        return;
    }
    out.extend_from_slice(matches.iter().map(|m| m.term.as_str()).join("|").as_bytes());
    out.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let matches = vec![
            Match::new("a", 0),
            Match::new("a b", 0),
            Match::new("b", 2),
            Match::new("a", 4),
            Match::new("b", 6),
        ];
        let deduped = dedup_by_term(matches);
        assert_eq!(
            deduped,
            vec![Match::new("a", 0), Match::new("a b", 0), Match::new("b", 2)]
        );
    }

    #[test]
    fn test_dedup_trivial_inputs() {
        assert!(dedup_by_term(Vec::new()).is_empty());
        assert_eq!(
            dedup_by_term(vec![Match::new("x", 3)]),
            vec![Match::new("x", 3)]
        );
    }

    #[test]
    fn test_write_result_line() {
        let mut out = Vec::new();
        write_result_line(&[], &mut out);
        write_result_line(&[Match::new("the cat", 0)], &mut out);
        write_result_line(
            &[Match::new("the", 0), Match::new("the cat", 0), Match::new("cat", 4)],
            &mut out,
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "-1\nthe cat\nthe|the cat|cat\n"
        );
    }
}
