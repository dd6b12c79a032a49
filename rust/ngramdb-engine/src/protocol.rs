//! Line protocol.
//!
//! Input is a bulk-load section of one n-gram per line, terminated by a line
//! holding only [`START_MARKER`], followed by workload lines:
//!
//! | Line       | Meaning                                   |
//! |------------|-------------------------------------------|
//! | `A <text>` | add an n-gram                             |
//! | `D <text>` | remove an n-gram                          |
//! | `Q <text>` | queue a query document                    |
//! | `F`        | evaluate queued queries and print results |
//!
//! Once the bulk load completes the engine prints [`READY_LINE`].

use ngramdb_common::{Error, Result};

pub const START_MARKER: &str = "S";

pub const READY_LINE: &[u8] = b"R\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Add(&'a str),
    Remove(&'a str),
    Query(&'a str),
    Flush,
}

/// Parses one workload line (without its line terminator).
///
/// `line_number` is 1-based and only used for error reporting.
pub fn parse_command(line: &str, line_number: u64) -> Result<Command<'_>> {
    let bytes = line.as_bytes();
    let Some(&prefix) = bytes.first() else {
        return Err(Error::malformed_line(line_number, "empty workload line"));
    };
    match prefix {
        b'F' if bytes.len() == 1 => Ok(Command::Flush),
        b'F' => Err(Error::malformed_line(
            line_number,
            "flush marker must stand alone",
        )),
        b'A' | b'D' | b'Q' => {
            if bytes.get(1) != Some(&b' ') {
                return Err(Error::malformed_line(
                    line_number,
                    format!("expected a space after '{}'", prefix as char),
                ));
            }
            let payload = &line[2..];
            Ok(match prefix {
                b'A' => Command::Add(payload),
                b'D' => Command::Remove(payload),
                _ => Command::Query(payload),
            })
        }
        _ => Err(Error::malformed_line(
            line_number,
            format!(
                "unknown command {:?}",
                line.chars().next().unwrap_or_default()
            ),
        )),
    }
}

/// Strips a trailing `\n` or `\r\n`.
pub fn trim_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use ngramdb_common::ErrorKind;

    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("A hello world", 1).unwrap(), Command::Add("hello world"));
        assert_eq!(parse_command("D x", 1).unwrap(), Command::Remove("x"));
        assert_eq!(parse_command("Q a  b ", 1).unwrap(), Command::Query("a  b "));
        assert_eq!(parse_command("Q ", 1).unwrap(), Command::Query(""));
        assert_eq!(parse_command("F", 1).unwrap(), Command::Flush);
    }

    #[test]
    fn test_malformed_lines() {
        for line in ["", "X foo", "Afoo", "Q", "F now", "é x"] {
            let err = parse_command(line, 7).unwrap_err();
            match err.kind() {
                ErrorKind::MalformedLine { line_number, .. } => assert_eq!(*line_number, 7),
                other => panic!("unexpected error for {line:?}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_trim_line_end() {
        assert_eq!(trim_line_end("A x\n"), "A x");
        assert_eq!(trim_line_end("A x\r\n"), "A x");
        assert_eq!(trim_line_end("F"), "F");
    }
}
