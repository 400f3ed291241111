//! Text helpers for titles and log previews.

use super::error::DomainError;

/// Maximum length (in bytes) of a conversation title.
pub const MAX_TITLE_LEN: usize = 120;

/// Shorten `s` to at most `max_len` bytes, appending `...` when cut.
///
/// Never splits a UTF-8 character.
pub fn preview(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len.saturating_sub(3).min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Normalize a user supplied conversation title.
///
/// Whitespace is trimmed; a blank title becomes `None` so the server can
/// pick its own default.
pub fn normalize_title(title: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(title) = title.map(str::trim) else {
        return Ok(None);
    };
    if title.is_empty() {
        return Ok(None);
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(DomainError::InvalidTitle(preview(title, 40)));
    }
    Ok(Some(title.to_string()))
}
