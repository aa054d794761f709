//! Input sanitization functions
//!
//! `sanitize_input` is a defense-in-depth filter for free-text fields, not a
//! full HTML sanitizer. Renderers must still escape what they display.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Complete script elements, content included
    static ref SCRIPT_BLOCK: Regex = Regex::new(r"(?is)<script[^>]*>.*?</script\s*>").unwrap();

    /// Complete iframe elements, content included
    static ref IFRAME_BLOCK: Regex = Regex::new(r"(?is)<iframe[^>]*>.*?</iframe\s*>").unwrap();

    /// Orphaned or truncated script/iframe tags
    static ref STRAY_TAG: Regex = Regex::new(r"(?i)<\s*/?\s*(?:script|iframe)[^>]*>?").unwrap();

    /// `javascript:` URL scheme
    static ref JAVASCRIPT_SCHEME: Regex = Regex::new(r"(?i)javascript\s*:").unwrap();

    /// Inline event handler attributes (onclick=, onload=, ...)
    static ref EVENT_HANDLER: Regex = Regex::new(r"(?i)\bon\w+\s*=").unwrap();
}

/// Maximum stored length of a channel title
pub const MAX_TITLE_LENGTH: usize = 200;
/// Maximum stored length of a channel description
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Remove dangerous patterns once, in a fixed order.
fn strip_dangerous_once(value: &str) -> String {
    let value = SCRIPT_BLOCK.replace_all(value, "");
    let value = IFRAME_BLOCK.replace_all(&value, "");
    let value = STRAY_TAG.replace_all(&value, "");
    let value = JAVASCRIPT_SCHEME.replace_all(&value, "");
    EVENT_HANDLER.replace_all(&value, "").into_owned()
}

/// Remove dangerous patterns until none are left.
///
/// A single pass can splice a new pattern together (`<scr<script>x</script>ipt>`),
/// so this repeats to a fixed point. Every change shortens the string, which
/// bounds the loop.
pub fn strip_dangerous(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let next = strip_dangerous_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Truncate to at most `max_length` characters. Hard cut, no ellipsis.
pub fn truncate_chars(value: &str, max_length: usize) -> String {
    match value.char_indices().nth(max_length) {
        Some((byte_index, _)) => value[..byte_index].to_string(),
        None => value.to_string(),
    }
}

/// Sanitize a free-text field.
///
/// Steps, in order: drop NUL bytes, trim, truncate to `max_length`
/// characters, strip script/iframe tags, `javascript:` and `on*=` handlers.
/// Truncation runs before stripping so a tag cut in half by the length limit
/// is still removed. A final trim keeps the function idempotent when a
/// stripped pattern sat next to whitespace.
pub fn sanitize_input(text: &str, max_length: usize) -> String {
    let without_nul: String = text.chars().filter(|c| *c != '\0').collect();
    let trimmed = without_nul.trim();
    let truncated = truncate_chars(trimmed, max_length);
    strip_dangerous(&truncated).trim().to_string()
}

/// Normalize a payout wallet address: trim only, addresses are case-sensitive
pub fn normalize_wallet_address(address: &str) -> String {
    address.trim().to_string()
}

/// Normalize a currency or network code: trim and uppercase
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
