#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
}

pub(super) fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// True when `bytes[idx]` is a word character (ASCII letters, digits, `_`).
pub(super) fn word_follows(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx).is_some_and(|b| is_word_byte(*b))
}
