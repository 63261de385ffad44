//! Shared helpers and constants.

use chrono::Utc;

pub const APP_NAME: &str = "forumfeed_backend";

/// Number of characters of post text shown in feed listings.
pub const SNIPPET_CHARS: usize = 50;

/// Current wall-clock time as Unix milliseconds (UTC).
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns the first `SNIPPET_CHARS` characters of `text`, never splitting a
/// multi-byte character.
pub fn text_snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub fn print_banner() {
    println!("{APP_NAME} {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let text = "é".repeat(60);
        let snippet = text_snippet(&text);
        assert_eq!(snippet.chars().count(), SNIPPET_CHARS);
        assert_eq!(text_snippet("short"), "short");
    }
}
