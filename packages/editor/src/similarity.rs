//! Similarity scoring on normalized text.

use crate::normalize::NormalizedText;

/// Normalized Levenshtein similarity in `0.0..=1.0`
pub fn similarity(a: &[char], b: &[char]) -> f64 {
    let a: String = a.iter().collect();
    let b: String = b.iter().collect();
    strsim::normalized_levenshtein(&a, &b)
}

pub fn similarity_ignore_case(a: &[char], b: &[char]) -> f64 {
    let a: String = a.iter().flat_map(|c| c.to_lowercase()).collect();
    let b: String = b.iter().flat_map(|c| c.to_lowercase()).collect();
    strsim::normalized_levenshtein(&a, &b)
}

/// How well the text around one occurrence agrees with the expected context.
///
/// The window compared against `context` is laid over the haystack so that
/// the occurrence sits where the searched text sits inside the context
/// (`anchor`); with no anchor the occurrence is centred.
pub fn context_score(
    haystack: &NormalizedText,
    occurrence: usize,
    query_len: usize,
    context: &NormalizedText,
    anchor: Option<usize>,
) -> f64 {
    if context.is_empty() {
        return 0.0;
    }

    let anchor = anchor.unwrap_or_else(|| context.len().saturating_sub(query_len) / 2);
    let start = occurrence.saturating_sub(anchor);
    let end = (occurrence + context.len().saturating_sub(anchor)).min(haystack.len());
    if start >= end {
        return 0.0;
    }

    similarity(&haystack.chars()[start..end], context.chars())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity(&chars("abc"), &chars("abc")), 1.0);
        assert_eq!(similarity(&chars("abc"), &chars("xyz")), 0.0);
        assert!(similarity(&chars("contractor"), &chars("contracter")) > 0.85);
    }

    #[test]
    fn test_ignore_case() {
        assert_eq!(similarity_ignore_case(&chars("Net Thirty"), &chars("net thirty")), 1.0);
    }

    #[test]
    fn test_context_score_prefers_matching_surroundings() {
        let hay = NormalizedText::new("The Buyer shall pay. The Seller shall deliver.");
        let context = NormalizedText::query("The Seller shall deliver.");
        let anchor = Some(11);

        let first = context_score(&hay, 10, 5, &context, anchor);
        let second = context_score(&hay, 32, 5, &context, anchor);

        assert_eq!(second, 1.0);
        assert!(first < 0.8);
    }

    #[test]
    fn test_context_score_window_clipped_at_edges() {
        let hay = NormalizedText::new("short text");
        let context = NormalizedText::query("a much longer context around short text here");
        let score = context_score(&hay, 0, 5, &context, Some(29));
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn test_empty_context_scores_zero() {
        let hay = NormalizedText::new("anything");
        let context = NormalizedText::query("");
        assert_eq!(context_score(&hay, 0, 3, &context, None), 0.0);
    }
}
