/// The Bot API rejects message texts longer than this many characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Shortens `text` to fit in a single message, marking the cut with an ellipsis. Counts characters, not bytes.
pub fn fit_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LENGTH {
        return text.to_string();
    }
    let mut result: String = text.chars().take(MAX_MESSAGE_LENGTH - 1).collect();
    result.push('…');
    result
}
