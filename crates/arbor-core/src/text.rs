//! Char-offset helpers.
//!
//! All text offsets in Arbor count Unicode scalar values, not bytes.

/// Number of chars in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the char at `index`, clamped to the end of the string.
pub fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices()
        .nth(index)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Slice by char offsets. Out-of-range bounds are clamped.
pub fn slice(s: &str, start: usize, end: usize) -> &str {
    let start_b = byte_offset(s, start);
    let end_b = byte_offset(s, end.max(start));
    &s[start_b..end_b]
}

/// Replace the chars in `[start, end)` with `insert`.
pub fn splice(s: &str, start: usize, end: usize, insert: &str) -> String {
    let start_b = byte_offset(s, start);
    let end_b = byte_offset(s, end.max(start));
    let mut out = String::with_capacity(s.len() - (end_b - start_b) + insert.len());
    out.push_str(&s[..start_b]);
    out.push_str(insert);
    out.push_str(&s[end_b..]);
    out
}
