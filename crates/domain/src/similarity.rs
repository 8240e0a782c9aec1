//! Order-independent fuzzy title matching
//!
//! Headlines about the same story from different outlets often reuse the same
//! words in a different order. Sorting the whitespace-separated tokens before
//! comparing makes such reorderings score as identical.

use rapidfuzz::fuzz;

/// Similarity of two strings on a 0-100 scale after sorting their tokens.
///
/// Tokens are split on whitespace, sorted and joined with single spaces; the
/// joined strings are then scored with the normalized indel similarity of
/// `rapidfuzz::fuzz::ratio`. Strings are compared exactly as given, so callers
/// decide on any case or punctuation normalization.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => 100.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => 100.0 * fuzz::ratio(a.chars(), b.chars()),
    }
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(token_sort_ratio("Budapest news today", "Budapest news today"), 100.0);
    }

    #[test]
    fn test_reordered_tokens_score_100() {
        assert_eq!(
            token_sort_ratio("raised taxes Hungary", "Hungary raised taxes"),
            100.0
        );
    }

    #[test]
    fn test_extra_whitespace_is_ignored() {
        assert_eq!(token_sort_ratio("  a   b ", "b a"), 100.0);
    }

    #[test]
    fn test_paraphrased_headline_scores_above_80() {
        let score = token_sort_ratio(
            "Hungary raised taxes on citizen income",
            "Hungary raised taxes on income",
        );
        assert!(score >= 80.0, "score was {score}");
        assert!(score < 100.0);
    }

    #[test]
    fn test_cyrillic_batch_duplicate_scores_above_80() {
        let score = token_sort_ratio(
            "Венгрия повысила налоги на доходы",
            "Венгрия повысила налоги на доходы граждан",
        );
        assert!(score >= 80.0, "score was {score}");
    }

    #[test]
    fn test_unrelated_headlines_score_low() {
        let score = token_sort_ratio(
            "Hungary raised taxes on citizen income",
            "Weather in Budapest this weekend",
        );
        assert!(score < 80.0, "score was {score}");
    }

    #[test]
    fn test_disjoint_short_strings_score_zero() {
        assert_eq!(token_sort_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_case_is_significant() {
        assert!(token_sort_ratio("NEWS", "news") < 100.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(token_sort_ratio("", ""), 100.0);
        assert_eq!(token_sort_ratio("", "something"), 0.0);
    }

    #[test]
    fn test_single_edit_matches_indel_ratio() {
        // 2 * 3 matching chars over 7 total
        let score = token_sort_ratio("abcd", "abc");
        assert!((score - 600.0 / 7.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_symmetry() {
        let a = "Parliament passes new budget";
        let b = "New budget passed by parliament";
        assert_eq!(token_sort_ratio(a, b), token_sort_ratio(b, a));
    }
}
