//! JDBC escape normalization
//!
//! Rewrites `{...}` escape regions into plain SQL by blanking the braces
//! and the introducer keyword with spaces. The output always has the same
//! length as the input, so offsets reported by the engine for the rewritten
//! text still point at the caller's original SQL. Quoted text, inside or
//! outside an escape, is never touched.
//!
//! `call` and `escape` are blanked like every other introducer. A `{call}`
//! region becomes a bare procedure invocation, and a LIKE clause such as
//! `LIKE 'a\_%' {escape '\'}` loses its `ESCAPE` keyword and leaves a bare
//! `'\'` after the pattern, which the engine rejects. Write `ESCAPE '\'` in
//! plain SQL where a LIKE escape character is needed.
//!
//! ```rust
//! use sqlbridge::escape::normalize;
//!
//! assert_eq!(normalize("{call foo(?)}").unwrap(), "      foo(?) ");
//! assert_eq!(
//!     normalize("SELECT * FROM T WHERE D = {d '2024-01-31'}").unwrap(),
//!     "SELECT * FROM T WHERE D =    '2024-01-31' "
//! );
//! ```

use crate::error::{Error, Result};

/// Recognized introducers, longest first where one is a prefix of another
const INTRODUCERS: &[&[u8]] = &[b"escape", b"call", b"fn", b"oj", b"ts", b"d", b"t"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InSingleQuote,
    InDoubleQuote,
    InEscape,
    InEscapeSingleQuote,
    InEscapeDoubleQuote,
}

/// Normalize escape sequences in `sql`
///
/// Unclosed escape regions are left as they are; an unrecognized introducer
/// fails with [`Error::MalformedEscapeSequence`].
pub fn normalize(sql: &str) -> Result<String> {
    if !sql.contains('{') {
        return Ok(sql.to_string());
    }

    let src = sql.as_bytes();
    let mut out = src.to_vec();
    let mut state = State::Outside;
    let mut depth = 0usize;
    let mut i = 0;

    while i < src.len() {
        let b = src[i];
        match state {
            State::Outside => match b {
                b'\'' => state = State::InSingleQuote,
                b'"' => state = State::InDoubleQuote,
                b'{' => {
                    i = open_escape(sql, &mut out, i)?;
                    depth += 1;
                    state = State::InEscape;
                    continue;
                }
                _ => {}
            },
            State::InSingleQuote if b == b'\'' => state = State::Outside,
            State::InDoubleQuote if b == b'"' => state = State::Outside,
            State::InEscapeSingleQuote if b == b'\'' => state = State::InEscape,
            State::InEscapeDoubleQuote if b == b'"' => state = State::InEscape,
            State::InEscape => match b {
                b'\'' => state = State::InEscapeSingleQuote,
                b'"' => state = State::InEscapeDoubleQuote,
                b'{' => {
                    i = open_escape(sql, &mut out, i)?;
                    depth += 1;
                    continue;
                }
                b'}' => {
                    out[i] = b' ';
                    depth -= 1;
                    if depth == 0 {
                        state = State::Outside;
                    }
                }
                _ => {}
            },
            _ => {}
        }
        i += 1;
    }

    // Only ASCII bytes were replaced with ASCII spaces
    String::from_utf8(out).map_err(|e| Error::Internal(format!("escape normalization: {}", e)))
}

/// Blank the `{` at `start` and its introducer; returns the index just
/// past the introducer
fn open_escape(sql: &str, out: &mut [u8], start: usize) -> Result<usize> {
    let src = sql.as_bytes();
    out[start] = b' ';
    let pos = skip_spaces(src, start + 1);

    let end = if src.get(pos) == Some(&b'?') {
        // `?= call`
        let mut j = skip_spaces(src, pos + 1);
        if src.get(j) != Some(&b'=') {
            return Err(malformed(sql, pos));
        }
        j = skip_spaces(src, j + 1);
        match match_introducer(src, j) {
            Some(len) if src[j..j + len].eq_ignore_ascii_case(b"call") => j + len,
            _ => return Err(malformed(sql, pos)),
        }
    } else {
        match match_introducer(src, pos) {
            Some(len) => pos + len,
            None => return Err(malformed(sql, pos)),
        }
    };

    for b in &mut out[pos..end] {
        *b = b' ';
    }
    Ok(end)
}

/// Length of the introducer at `pos`, if one is there and is followed by
/// whitespace
fn match_introducer(src: &[u8], pos: usize) -> Option<usize> {
    INTRODUCERS.iter().find_map(|keyword| {
        let end = pos + keyword.len();
        let candidate = src.get(pos..end)?;
        let followed_by_space = src.get(end).map(u8::is_ascii_whitespace).unwrap_or(false);
        (candidate.eq_ignore_ascii_case(keyword) && followed_by_space).then_some(keyword.len())
    })
}

fn skip_spaces(src: &[u8], mut pos: usize) -> usize {
    while pos < src.len() && src[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn malformed(sql: &str, offset: usize) -> Error {
    let text: String = sql
        .get(offset..)
        .unwrap_or_default()
        .chars()
        .take(32)
        .collect();
    Error::MalformedEscapeSequence { offset, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(input: &str, expected: &str) {
        let output = normalize(input).unwrap();
        assert_eq!(output, expected);
        assert_eq!(output.len(), input.len());
    }

    fn blank(n: usize) -> String {
        " ".repeat(n)
    }

    #[test]
    fn test_no_escape_is_unchanged() {
        check("SELECT 1 FROM T", "SELECT 1 FROM T");
        check("", "");
    }

    #[test]
    fn test_call() {
        check("{call foo(?)}", "      foo(?) ");
        check("{CALL foo(?)}", &format!("{}foo(?) ", blank(6)));
        check("{ ?= call foo(?)}", &format!("{}foo(?) ", blank(10)));
        check("{?=call foo}", &format!("{}foo ", blank(8)));
    }

    #[test]
    fn test_introducers() {
        check("{fn NOW()}", &format!("{}NOW() ", blank(4)));
        check(
            "{ts '2024-01-31 10:00:00'}",
            &format!("{}'2024-01-31 10:00:00' ", blank(4)),
        );
        check("{t '10:00:00'}", &format!("{}'10:00:00' ", blank(3)));
        check(
            "SELECT * FROM {oj A LEFT OUTER JOIN B ON A.ID = B.ID}",
            &format!("SELECT * FROM{}A LEFT OUTER JOIN B ON A.ID = B.ID ", blank(5)),
        );
        check(
            r"WHERE N LIKE 'a\_%' {escape '\'}",
            &format!(r"WHERE N LIKE 'a\_%'{}'\' ", blank(9)),
        );
    }

    #[test]
    fn test_nested_escapes() {
        check(
            "{call p(?, {ts '2024-01-01 00:00:00'}, {fn ABS(-1)})}",
            &format!(
                "{}p(?, {}'2024-01-01 00:00:00' , {}ABS(-1) ) ",
                blank(6),
                blank(4),
                blank(4)
            ),
        );
    }

    #[test]
    fn test_quoted_braces_untouched() {
        check("SELECT '{x}' FROM T", "SELECT '{x}' FROM T");
        check("SELECT \"{x}\" FROM T", "SELECT \"{x}\" FROM T");
        check("{call p('}{')}", &format!("{}p('}}{{') ", blank(6)));
        check("{call p(\"}\")}", &format!("{}p(\"}}\") ", blank(6)));
    }

    #[test]
    fn test_multibyte_text_preserved() {
        check(
            "{call p('héllo')} -- ü",
            &format!("{}p('héllo')  -- ü", blank(6)),
        );
    }

    #[test]
    fn test_unknown_introducer() {
        match normalize("SELECT {foo 1}") {
            Err(Error::MalformedEscapeSequence { offset, text }) => {
                assert_eq!(offset, 8);
                assert_eq!(text, "foo 1}");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(normalize("{call}").is_err());
        assert!(normalize("{? foo}").is_err());
    }

    #[test]
    fn test_unclosed_escape_is_left_open() {
        check("{call foo(", &format!("{}foo(", blank(6)));
    }

    #[test]
    fn test_stray_close_brace_outside() {
        check(
            "SELECT 1 } {d '2024-01-01'}",
            &format!("SELECT 1 }}{}'2024-01-01' ", blank(4)),
        );
    }
}
