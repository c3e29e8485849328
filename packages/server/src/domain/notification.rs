//! Notification summary formatting.
//!
//! Pure functions shared by the consolidator and its tests.

/// Display name used when the sender's profile cannot be resolved.
pub const UNKNOWN_SENDER: &str = "Unknown";

const ELLIPSIS: &str = "...";

/// Truncate `content` to at most `max_chars` characters.
///
/// When truncation happens the result ends with `...` and still fits in
/// `max_chars` (e.g. 50 -> 47 characters of content plus the ellipsis).
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut preview: String = content.chars().take(keep).collect();
    preview.push_str(ELLIPSIS);
    preview
}

/// Build the human-readable notification line `"{sender}: {preview}"`.
pub fn build_summary(sender_name: &str, content: &str, max_chars: usize) -> String {
    format!("{}: {}", sender_name, truncate_preview(content, max_chars))
}
