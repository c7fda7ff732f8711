//! Text processing utilities.

/// Default number of characters shown in content previews.
pub const PREVIEW_CHARS: usize = 200;

/// Cut `content` to at most `max_chars` characters, appending `...` when cut.
pub fn preview(content: &str, max_chars: usize) -> String {
    let head: String = content.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        format!("{}...", head)
    } else {
        head
    }
}
