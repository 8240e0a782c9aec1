//! Bounded-length display text

/// Maximum characters of a summary, ellipsis included
pub const MAX_SUMMARY_CHARS: usize = 500;

const ELLIPSIS: char = '…';

/// Trim `text` and shorten it to at most [`MAX_SUMMARY_CHARS`] characters.
///
/// Longer text is cut at the last whitespace within the first
/// `MAX_SUMMARY_CHARS - 1` characters (or hard-cut there when it contains no
/// whitespace) and terminated with an ellipsis.
pub fn summarize(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_SUMMARY_CHARS {
        return text.to_string();
    }

    let head: String = text.chars().take(MAX_SUMMARY_CHARS - 1).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) => &head[..idx],
        None => head.as_str(),
    };

    let mut summary = cut.trim_end().to_string();
    summary.push(ELLIPSIS);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        let text = "Короткий текст.";
        assert_eq!(summarize(text), text);
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(summarize("  headline \n"), "headline");
    }

    #[test]
    fn test_exactly_max_chars_unchanged() {
        let text = "я".repeat(MAX_SUMMARY_CHARS);
        assert_eq!(summarize(&text), text);
    }

    #[test]
    fn test_long_text_without_whitespace_is_hard_cut() {
        let text = "А".repeat(600);
        let result = summarize(&text);

        assert_eq!(result.chars().count(), MAX_SUMMARY_CHARS);
        assert!(result.ends_with('…'));
    }

    #[test]
    fn test_trim_at_word_boundary() {
        let text = vec!["слово"; 120].join(" ");
        let result = summarize(&text);

        assert!(result.chars().count() <= MAX_SUMMARY_CHARS);
        assert!(result.ends_with('…'));
        let body = result.trim_end_matches('…');
        assert!(!body.ends_with(' '));
        assert!(body.split(' ').all(|word| word == "слово"));
    }

    #[test]
    fn test_multiple_spaces_before_cut_are_trimmed() {
        let mut text = "a".repeat(490);
        text.push_str("     ");
        text.push_str(&"b".repeat(50));
        let result = summarize(&text);

        assert_eq!(result, format!("{}…", "a".repeat(490)));
    }
}
