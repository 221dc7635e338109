//! Comparison-only text normalization.
//!
//! Whitespace runs collapse to a single space, typographic quotes and dashes
//! fold to ASCII and invisible format characters are dropped. Every
//! normalized character remembers the byte offset of the source character it
//! came from, so a match found on normalized text maps back onto the original.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    chars: Vec<char>,

    /// Source byte offset per normalized char, plus the source length
    origin: Vec<usize>,
}

impl NormalizedText {
    /// Normalize searchable text (offsets preserved, nothing trimmed)
    pub fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len() + 1);
        let mut in_space = false;

        for (offset, c) in text.char_indices() {
            if is_invisible(c) {
                continue;
            }
            if c.is_whitespace() {
                if !in_space {
                    chars.push(' ');
                    origin.push(offset);
                    in_space = true;
                }
                continue;
            }
            chars.push(fold(c));
            origin.push(offset);
            in_space = false;
        }
        origin.push(text.len());

        Self { chars, origin }
    }

    /// Normalize a search query: as [`NormalizedText::new`], then trimmed
    pub fn query(text: &str) -> Self {
        let normalized = Self::new(text);

        let start = normalized.chars.iter().take_while(|c| **c == ' ').count();
        let end = normalized.chars.len() - normalized.chars[start..].iter().rev().take_while(|c| **c == ' ').count();

        Self {
            chars: normalized.chars[start..end].to_vec(),
            origin: normalized.origin[start..=end].to_vec(),
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Source byte range covered by normalized chars `start..end`
    pub fn source_range(&self, start: usize, end: usize) -> Range<usize> {
        self.origin[start]..self.origin[end]
    }

    pub fn slice(&self, range: Range<usize>) -> String {
        self.chars[range].iter().collect()
    }

    /// Whether position `index` begins a word
    pub fn is_word_start(&self, index: usize) -> bool {
        index < self.chars.len() && self.chars[index] != ' ' && (index == 0 || self.chars[index - 1] == ' ')
    }

    /// Whether position `index` ends a word
    pub fn is_word_end(&self, index: usize) -> bool {
        index > 0 && self.chars[index - 1] != ' ' && (index == self.chars.len() || self.chars[index] == ' ')
    }
}

/// Start positions of every (possibly overlapping) occurrence of `needle`
pub fn find_all(haystack: &[char], needle: &[char]) -> Vec<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(start, _)| start)
        .collect()
}

fn fold(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
        '\u{2010}'..='\u{2015}' | '\u{2212}' => '-',
        _ => c,
    }
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_collapses_and_maps_back() {
        let source = "Net\t 30\n\ndays";
        let text = NormalizedText::new(source);

        assert_eq!(text.slice(0..text.len()), "Net 30 days");

        let start = find_all(text.chars(), &"30 days".chars().collect::<Vec<_>>())[0];
        let range = text.source_range(start, start + 7);
        assert_eq!(&source[range], "30\n\ndays");
    }

    #[test]
    fn test_quotes_and_dashes_fold() {
        let text = NormalizedText::new("the \u{201C}Buyer\u{201D} \u{2014} it\u{2019}s");
        assert_eq!(text.slice(0..text.len()), "the \"Buyer\" - it's");
    }

    #[test]
    fn test_query_trims_and_keeps_mapping() {
        let query = NormalizedText::query("  may use  ");
        assert_eq!(query.slice(0..query.len()), "may use");
        assert_eq!(query.source_range(0, query.len()), 2..9);
    }

    #[test]
    fn test_multibyte_offsets() {
        let source = "café\u{00A0}prix";
        let text = NormalizedText::new(source);
        assert_eq!(text.slice(0..text.len()), "café prix");

        let range = text.source_range(5, 9);
        assert_eq!(&source[range], "prix");
    }

    #[test]
    fn test_invisible_chars_dropped() {
        let text = NormalizedText::new("sub\u{00AD}contract");
        assert_eq!(text.slice(0..text.len()), "subcontract");
    }

    #[test]
    fn test_find_all_overlapping() {
        let hay: Vec<char> = "aaaa".chars().collect();
        let needle: Vec<char> = "aa".chars().collect();
        assert_eq!(find_all(&hay, &needle), vec![0, 1, 2]);
        assert!(find_all(&hay, &[]).is_empty());
    }

    #[test]
    fn test_word_boundaries() {
        let text = NormalizedText::new("ab cd");
        assert!(text.is_word_start(0));
        assert!(!text.is_word_start(1));
        assert!(text.is_word_start(3));
        assert!(text.is_word_end(2));
        assert!(text.is_word_end(5));
        assert!(!text.is_word_end(4));
    }
}
