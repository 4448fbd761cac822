use std::borrow::Cow;

mod scanner;

use scanner::{State, word_follows};

/// Byte offsets of every `marker` that sits outside a single-quoted literal.
///
/// Literal boundaries follow standard SQL: a doubled quote (`''`) inside a literal
/// is an escaped quote and does not close it. An unterminated literal swallows
/// the rest of the statement.
#[must_use]
pub fn positional_marker_offsets(sql: &str, marker: char) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut state = State::Normal;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match state {
            State::Normal => {
                if ch == '\'' {
                    state = State::SingleQuoted;
                } else if ch == marker {
                    offsets.push(idx);
                }
            }
            State::SingleQuoted => {
                if ch == '\'' {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next(); // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
        }
    }

    offsets
}

/// Replace `:key` markers in one left-to-right pass.
///
/// `candidates` is `(key, replacement)` in precedence order: at each `:` the first
/// key whose occurrence is not immediately followed by a word character wins.
/// Inserted replacements are never rescanned. Returns a borrowed `Cow` when
/// nothing matched.
#[must_use]
pub fn substitute_named<'a>(sql: &'a str, candidates: &[(String, String)]) -> Cow<'a, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] != b':' {
            idx += 1;
            continue;
        }

        let rest = &sql[idx + 1..];
        let hit = candidates.iter().find(|(key, _)| {
            !key.is_empty()
                && rest.starts_with(key.as_str())
                && !word_follows(bytes, idx + 1 + key.len())
        });

        if let Some((key, replacement)) = hit {
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
            buf.push_str(&sql[copied_to..idx]);
            buf.push_str(replacement);
            idx += 1 + key.len();
            copied_to = idx;
        } else {
            idx += 1;
        }
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}
