//! Utility helpers shared across the frontend.

use unicode_segmentation::UnicodeSegmentation;

use crate::constants::PREVIEW_MAX_GRAPHEMES;

/// Build a conversation-list preview from a message body: single line,
/// truncated on a grapheme boundary so multi-byte text never tears.
pub fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out: String = flat.graphemes(true).take(PREVIEW_MAX_GRAPHEMES).collect();
    if flat.graphemes(true).count() > PREVIEW_MAX_GRAPHEMES {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(preview("hello\n  world"), "hello world");

        let long = "x".repeat(200);
        let p = preview(&long);
        assert!(p.ends_with('…'));
        assert_eq!(p.graphemes(true).count(), PREVIEW_MAX_GRAPHEMES + 1);
    }

    #[test]
    fn preview_respects_grapheme_boundaries() {
        // family emoji is one grapheme but many bytes
        let s = "👨‍👩‍👧‍👦".repeat(60);
        let p = preview(&s);
        assert!(p.graphemes(true).count() <= PREVIEW_MAX_GRAPHEMES + 1);
    }

    #[test]
    fn preview_of_empty_string_is_empty() {
        assert_eq!(preview(""), "");
    }
}
