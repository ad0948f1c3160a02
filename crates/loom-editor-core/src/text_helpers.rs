//! Char-offset helpers for leaf text.
//!
//! All offsets exchanged with the host are counted in Unicode scalar values
//! (chars), never bytes.

/// Length of `text` in chars.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the char at `char_offset`, clamped to the end of `text`.
pub fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Split `text` at a char offset.
pub fn split_at_char(text: &str, char_offset: usize) -> (&str, &str) {
    text.split_at(byte_index(text, char_offset))
}

/// Insert `insert` into `text` at a char offset.
pub fn insert_at_char(text: &mut String, char_offset: usize, insert: &str) {
    let idx = byte_index(text, char_offset);
    text.insert_str(idx, insert);
}

/// Remove the char range `start..end` from `text`.
pub fn remove_char_range(text: &mut String, start: usize, end: usize) {
    let start_byte = byte_index(text, start);
    let end_byte = byte_index(text, end.max(start));
    text.replace_range(start_byte..end_byte, "");
}

/// Split text into leading whitespace, core and trailing whitespace.
pub fn split_outer_whitespace(text: &str) -> (&str, &str, &str) {
    let trimmed_start = text.trim_start();
    let lead = &text[..text.len() - trimmed_start.len()];
    let core = trimmed_start.trim_end();
    let trail = &trimmed_start[core.len()..];
    (lead, core, trail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_index_multibyte() {
        let text = "héllo";
        assert_eq!(byte_index(text, 0), 0);
        assert_eq!(byte_index(text, 2), 3);
        assert_eq!(byte_index(text, 99), text.len());
    }

    #[test]
    fn test_split_and_insert() {
        assert_eq!(split_at_char("wörld", 2), ("wö", "rld"));

        let mut text = String::from("héllo");
        insert_at_char(&mut text, 2, "XX");
        assert_eq!(text, "héXXllo");

        remove_char_range(&mut text, 1, 4);
        assert_eq!(text, "hllo");
    }

    #[test]
    fn test_split_outer_whitespace() {
        assert_eq!(split_outer_whitespace("  a b "), ("  ", "a b", " "));
        assert_eq!(split_outer_whitespace("   "), ("   ", "", ""));
        assert_eq!(split_outer_whitespace("x"), ("", "x", ""));
    }
}
