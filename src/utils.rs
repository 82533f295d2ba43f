/// Maximum characters of a non-success response body written to the log.
pub const BODY_PREVIEW_CHARS: usize = 400;
/// Maximum characters of an offending record written to the log.
pub const RECORD_PREVIEW_CHARS: usize = 300;

/// Cuts `text` to at most `max_chars` characters, never splitting a UTF-8 sequence.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
